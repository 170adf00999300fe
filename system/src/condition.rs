// This file is part of mos64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use core::fmt;
use core::iter::Peekable;
use core::str::Chars;

use mos64_core::factory::{Cpu, Register};

enum Operator {
    Equal,
    NotEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Operator::Equal => write!(f, "=="),
            Operator::NotEqual => write!(f, "!="),
            Operator::Greater => write!(f, ">"),
            Operator::GreaterEqual => write!(f, ">="),
            Operator::Less => write!(f, "<"),
            Operator::LessEqual => write!(f, "<="),
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Register::A => write!(f, "A"),
            Register::X => write!(f, "X"),
            Register::Y => write!(f, "Y"),
            Register::Sp => write!(f, "SP"),
            Register::Pc => write!(f, "PC"),
            Register::P => write!(f, "P"),
        }
    }
}

enum Value {
    Constant(u16),
    Register(Register),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Constant(val) if *val <= 0xff => write!(f, "{:02x}", val),
            Value::Constant(val) => write!(f, "{:04x}", val),
            Value::Register(reg) => write!(f, "{}", reg),
        }
    }
}

/// A breakpoint qualifier evaluated against the CPU's registers, e.g. `x ==
/// 05` or `a != y`. Parsed from a debugger command string.
pub struct Condition {
    op: Operator,
    reg: Register,
    val: Value,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {} {}", self.reg, self.op, self.val)
    }
}

impl Condition {
    pub fn parse(expr: &str, radix: Option<u32>) -> Result<Condition, String> {
        let parser = Parser::new(radix.unwrap_or(16));
        parser.parse(expr)
    }

    pub fn eval(&self, cpu: &dyn Cpu) -> bool {
        match self.op {
            Operator::Equal => self.eval_reg(self.reg, cpu) == self.eval_val(&self.val, cpu),
            Operator::NotEqual => self.eval_reg(self.reg, cpu) != self.eval_val(&self.val, cpu),
            Operator::Greater => self.eval_reg(self.reg, cpu) > self.eval_val(&self.val, cpu),
            Operator::GreaterEqual => {
                self.eval_reg(self.reg, cpu) >= self.eval_val(&self.val, cpu)
            }
            Operator::Less => self.eval_reg(self.reg, cpu) < self.eval_val(&self.val, cpu),
            Operator::LessEqual => self.eval_reg(self.reg, cpu) <= self.eval_val(&self.val, cpu),
        }
    }

    fn eval_reg(&self, reg: Register, cpu: &dyn Cpu) -> u16 {
        match reg {
            Register::Pc => cpu.get_pc(),
            reg => u16::from(cpu.get_register(reg)),
        }
    }

    fn eval_val(&self, val: &Value, cpu: &dyn Cpu) -> u16 {
        match val {
            Value::Constant(value) => *value,
            Value::Register(reg) => self.eval_reg(*reg, cpu),
        }
    }
}

struct Parser {
    radix: u32,
}

impl Parser {
    pub fn new(radix: u32) -> Self {
        Parser { radix }
    }

    pub fn parse(&self, expr: &str) -> Result<Condition, String> {
        let mut tokenizer = Tokenizer::new(expr.chars());
        let reg = match tokenizer.next() {
            Some(Token::Atom(token)) => self.parse_reg(token.as_str()),
            _ => Err(format!("Invalid expression {}", expr)),
        }?;
        let op = match tokenizer.next() {
            Some(Token::Op(token)) => self.parse_op(token.as_str()),
            _ => Err(format!("Invalid expression {}", expr)),
        }?;
        let val = match tokenizer.next() {
            Some(Token::Atom(token)) => self.parse_val(token.as_str()),
            _ => Err(format!("Invalid expression {}", expr)),
        }?;
        Ok(Condition { op, reg, val })
    }

    fn parse_num(&self, num: &str) -> Result<u16, String> {
        u16::from_str_radix(num, self.radix).map_err(|_| format!("Invalid number {}", num))
    }

    fn parse_op(&self, op: &str) -> Result<Operator, String> {
        match op {
            "==" => Ok(Operator::Equal),
            "!=" => Ok(Operator::NotEqual),
            ">" => Ok(Operator::Greater),
            ">=" => Ok(Operator::GreaterEqual),
            "<" => Ok(Operator::Less),
            "<=" => Ok(Operator::LessEqual),
            _ => Err(format!("Invalid op {}", op)),
        }
    }

    fn parse_reg(&self, reg: &str) -> Result<Register, String> {
        match reg {
            "a" | "A" => Ok(Register::A),
            "x" | "X" => Ok(Register::X),
            "y" | "Y" => Ok(Register::Y),
            "p" | "P" => Ok(Register::P),
            "sp" | "SP" => Ok(Register::Sp),
            "pc" | "PC" => Ok(Register::Pc),
            _ => Err(format!("Invalid register {}", reg)),
        }
    }

    fn parse_val(&self, val: &str) -> Result<Value, String> {
        match self.parse_reg(val) {
            Ok(reg) => Ok(Value::Register(reg)),
            Err(_) => self.parse_num(val).map(Value::Constant),
        }
    }
}

#[derive(Eq, PartialEq)]
enum Token {
    Atom(String),
    Op(String),
}

struct Tokenizer<'a> {
    iter: Peekable<Chars<'a>>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: Chars<'a>) -> Tokenizer<'a> {
        Tokenizer {
            iter: input.peekable(),
        }
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        match *self.iter.peek().unwrap_or(&'\u{22a5}') {
            c if c.is_alphanumeric() => Some(Token::Atom(consume_while(&mut self.iter, |c| {
                c.is_alphanumeric()
            }))),
            c if is_symbol(c) => Some(Token::Op(consume_while(&mut self.iter, is_symbol))),
            c if c.is_whitespace() => {
                self.iter.next();
                self.next()
            }
            '\u{22a5}' => None,
            _ => None,
        }
    }
}

fn consume_while<F>(iter: &mut Peekable<Chars>, predicate: F) -> String
where
    F: Fn(char) -> bool,
{
    let mut s = String::new();
    while let Some(&c) = iter.peek() {
        if !predicate(c) {
            break;
        }
        iter.next();
        s.push(c);
    }
    s
}

fn is_symbol(c: char) -> bool {
    matches!(c, '<' | '=' | '>' | '!')
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeCpu {
        a: u8,
        x: u8,
        pc: u16,
    }

    impl Cpu for FakeCpu {
        fn get_register(&self, reg: Register) -> u8 {
            match reg {
                Register::A => self.a,
                Register::X => self.x,
                _ => 0,
            }
        }
        fn set_register(&mut self, _reg: Register, _value: u8) {}
        fn get_pc(&self) -> u16 {
            self.pc
        }
        fn set_pc(&mut self, value: u16) {
            self.pc = value;
        }
        fn get_error_state(&self) -> mos64_core::factory::CpuErrorState {
            mos64_core::factory::CpuErrorState::Ok
        }
        fn clear_error_state(&mut self) {}
        fn set_breakpoint(&mut self, _address: u16, _tag: mos64_core::factory::BreakpointTag) {}
        fn clear_breakpoints(&mut self) {}
        fn clock(&mut self) {}
        fn reset(&mut self) {}
        fn read(&self, _address: u16) -> u8 {
            0
        }
        fn write(&mut self, _address: u16, _value: u8) {}
    }

    #[test]
    fn parses_register_equality() {
        let cond = Condition::parse("x == 05", None).unwrap();
        let cpu = FakeCpu { a: 0, x: 0x05, pc: 0 };
        assert!(cond.eval(&cpu));
    }

    #[test]
    fn parses_register_to_register_comparison() {
        let cond = Condition::parse("a != x", None).unwrap();
        let cpu = FakeCpu { a: 1, x: 2, pc: 0 };
        assert!(cond.eval(&cpu));
    }

    #[test]
    fn rejects_malformed_expression() {
        assert!(Condition::parse("garbage", None).is_err());
    }
}
