// This file is part of mos64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

mod sid;

pub use self::sid::{SamplingMethod, Sid};
