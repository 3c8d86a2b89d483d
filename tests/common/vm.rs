//! A small interpreter for the emitted instruction set, enough to run the
//! programs the tests compile.
//!
//! `gp` is fixed at 0. `CALL` saves `(pc, fp)` and sets `fp = sp`.
//! `RETURN` keeps the top value as the call's result when the callee left
//! one above `fp`, drops the callee's slots and restores `(pc, fp)`; the
//! arguments stay where the caller pushed them.

use std::collections::{HashMap, VecDeque};

use pvmc::codegen::Instruction;

const STEP_LIMIT: usize = 100_000;

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Int(i64),
    Str(String),
    Addr(usize),
    Code(usize),
}

struct Vm<'a> {
    code: &'a [Instruction],
    labels: HashMap<&'a str, usize>,
    stack: Vec<Value>,
    fp: usize,
    calls: Vec<(usize, usize)>,
    input: VecDeque<String>,
    output: Vec<String>,
}

pub fn run(code: &[Instruction], input: &[&str]) -> Result<Vec<String>, String> {
    let labels = code
        .iter()
        .enumerate()
        .filter_map(|(i, ins)| match ins {
            Instruction::Label(l) => Some((l.as_str(), i)),
            _ => None,
        })
        .collect();
    let mut vm = Vm {
        code,
        labels,
        stack: vec![],
        fp: 0,
        calls: vec![],
        input: input.iter().map(|s| s.to_string()).collect(),
        output: vec![],
    };
    vm.execute()?;
    Ok(vm.output)
}

impl Vm<'_> {
    fn pop(&mut self) -> Result<Value, String> {
        self.stack.pop().ok_or_else(|| "stack underflow".to_string())
    }

    fn pop_int(&mut self) -> Result<i64, String> {
        match self.pop()? {
            Value::Int(n) => Ok(n),
            v => Err(format!("expected an integer, found {v:?}")),
        }
    }

    fn pop_str(&mut self) -> Result<String, String> {
        match self.pop()? {
            Value::Str(s) => Ok(s),
            v => Err(format!("expected a string, found {v:?}")),
        }
    }

    fn pop_addr(&mut self) -> Result<usize, String> {
        match self.pop()? {
            Value::Addr(a) => Ok(a),
            v => Err(format!("expected an address, found {v:?}")),
        }
    }

    fn jump(&self, label: &str) -> Result<usize, String> {
        self.labels
            .get(label)
            .copied()
            .ok_or_else(|| format!("unknown label {label}"))
    }

    fn index(base: usize, offset: i64) -> Result<usize, String> {
        usize::try_from(base as i64 + offset).map_err(|_| format!("bad offset {offset}"))
    }

    fn load(&self, at: usize) -> Result<Value, String> {
        self.stack
            .get(at)
            .cloned()
            .ok_or_else(|| format!("load outside the stack at {at}"))
    }

    fn store(&mut self, at: usize, value: Value) -> Result<(), String> {
        match self.stack.get_mut(at) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(format!("store outside the stack at {at}")),
        }
    }

    fn binary(&mut self, f: impl Fn(i64, i64) -> Result<i64, String>) -> Result<(), String> {
        let b = self.pop_int()?;
        let a = self.pop_int()?;
        self.stack.push(Value::Int(f(a, b)?));
        Ok(())
    }

    fn execute(&mut self) -> Result<(), String> {
        let code = self.code;
        let mut pc = 0;
        for _ in 0..STEP_LIMIT {
            let Some(ins) = code.get(pc) else {
                return Err("ran past the end of the program".to_string());
            };
            pc += 1;

            match ins {
                Instruction::PushI(n) => self.stack.push(Value::Int(*n)),
                Instruction::PushN(n) => {
                    for _ in 0..*n {
                        self.stack.push(Value::Int(0));
                    }
                }
                Instruction::PushG(o) => {
                    let v = self.load(Self::index(0, *o)?)?;
                    self.stack.push(v);
                }
                Instruction::PushL(o) => {
                    let v = self.load(Self::index(self.fp, *o)?)?;
                    self.stack.push(v);
                }
                Instruction::PushFp => self.stack.push(Value::Addr(self.fp)),
                Instruction::PushGp => self.stack.push(Value::Addr(0)),
                Instruction::PushA(l) => {
                    let target = self.jump(l)?;
                    self.stack.push(Value::Code(target));
                }
                Instruction::PushS(s) => self.stack.push(Value::Str(s.clone())),
                Instruction::StoreG(o) => {
                    let v = self.pop()?;
                    self.store(Self::index(0, *o)?, v)?;
                }
                Instruction::StoreL(o) => {
                    let v = self.pop()?;
                    self.store(Self::index(self.fp, *o)?, v)?;
                }
                Instruction::Store(n) => {
                    let v = self.pop()?;
                    let a = self.pop_addr()?;
                    self.store(Self::index(a, *n)?, v)?;
                }
                Instruction::Load(n) => {
                    let a = self.pop_addr()?;
                    let v = self.load(Self::index(a, *n)?)?;
                    self.stack.push(v);
                }
                Instruction::PAdd => {
                    let n = self.pop_int()?;
                    let a = self.pop_addr()?;
                    self.stack.push(Value::Addr(Self::index(a, n)?));
                }
                Instruction::Add => self.binary(|a, b| Ok(a + b))?,
                Instruction::Sub => self.binary(|a, b| Ok(a - b))?,
                Instruction::Mul => self.binary(|a, b| Ok(a * b))?,
                Instruction::Div => self.binary(|a, b| {
                    a.checked_div(b).ok_or_else(|| "division by zero".to_string())
                })?,
                Instruction::Mod => self.binary(|a, b| {
                    a.checked_rem(b).ok_or_else(|| "division by zero".to_string())
                })?,
                Instruction::Equal => {
                    let b = self.pop()?;
                    let a = self.pop()?;
                    self.stack.push(Value::Int(i64::from(a == b)));
                }
                Instruction::Not => {
                    let a = self.pop_int()?;
                    self.stack.push(Value::Int(i64::from(a == 0)));
                }
                Instruction::Inf => self.binary(|a, b| Ok(i64::from(a < b)))?,
                Instruction::Sup => self.binary(|a, b| Ok(i64::from(a > b)))?,
                Instruction::InfEq => self.binary(|a, b| Ok(i64::from(a <= b)))?,
                Instruction::SupEq => self.binary(|a, b| Ok(i64::from(a >= b)))?,
                Instruction::And => self.binary(|a, b| Ok(i64::from(a != 0 && b != 0)))?,
                Instruction::Or => self.binary(|a, b| Ok(i64::from(a != 0 || b != 0)))?,
                Instruction::Jump(l) => pc = self.jump(l)?,
                Instruction::Jz(l) => {
                    if self.pop_int()? == 0 {
                        pc = self.jump(l)?;
                    }
                }
                Instruction::Call => {
                    let Value::Code(target) = self.pop()? else {
                        return Err("CALL without a code address".to_string());
                    };
                    self.calls.push((pc, self.fp));
                    self.fp = self.stack.len();
                    pc = target;
                }
                Instruction::Return => {
                    let result = if self.stack.len() > self.fp {
                        self.stack.pop()
                    } else {
                        None
                    };
                    self.stack.truncate(self.fp);
                    let (ret_pc, ret_fp) = self
                        .calls
                        .pop()
                        .ok_or_else(|| "RETURN outside a call".to_string())?;
                    pc = ret_pc;
                    self.fp = ret_fp;
                    self.stack.extend(result);
                }
                Instruction::Read => {
                    let line = self
                        .input
                        .pop_front()
                        .ok_or_else(|| "input exhausted".to_string())?;
                    self.stack.push(Value::Str(line));
                }
                Instruction::Atoi => {
                    let s = self.pop_str()?;
                    let n = s
                        .trim()
                        .parse()
                        .map_err(|_| format!("not an integer: {s:?}"))?;
                    self.stack.push(Value::Int(n));
                }
                Instruction::WriteI => {
                    let n = self.pop_int()?;
                    self.output.push(n.to_string());
                }
                Instruction::WriteS => {
                    let s = self.pop_str()?;
                    self.output.push(s);
                }
                Instruction::StrLen => {
                    let s = self.pop_str()?;
                    self.stack.push(Value::Int(s.len() as i64));
                }
                Instruction::CharAt => {
                    let i = self.pop_int()?;
                    let s = self.pop_str()?;
                    let c = usize::try_from(i)
                        .ok()
                        .and_then(|i| s.as_bytes().get(i).copied())
                        .ok_or_else(|| format!("index {i} outside {s:?}"))?;
                    self.stack.push(Value::Int(i64::from(c)));
                }
                Instruction::Start => self.fp = self.stack.len(),
                Instruction::Stop => return Ok(()),
                Instruction::Label(_) => (),
            }
        }
        Err("step limit reached".to_string())
    }
}
