use std::fmt;

/// One instruction of the target stack machine. `Display` renders the exact
/// mnemonic text the machine loads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Instruction {
    PushI(i64),
    PushN(i64),
    PushG(i64),
    PushL(i64),
    PushFp,
    PushGp,
    PushA(String),
    PushS(String),
    StoreG(i64),
    StoreL(i64),
    Store(i64),
    Load(i64),
    PAdd,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Equal,
    Not,
    Inf,
    Sup,
    InfEq,
    SupEq,
    And,
    Or,
    Jump(String),
    Jz(String),
    Call,
    Return,
    Read,
    Atoi,
    WriteI,
    WriteS,
    StrLen,
    CharAt,
    Start,
    Stop,
    Label(String),
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::PushI(n) => write!(f, "PUSHI {n}"),
            Instruction::PushN(n) => write!(f, "PUSHN {n}"),
            Instruction::PushG(o) => write!(f, "PUSHG {o}"),
            Instruction::PushL(o) => write!(f, "PUSHL {o}"),
            Instruction::PushFp => write!(f, "PUSHFP"),
            Instruction::PushGp => write!(f, "PUSHGP"),
            Instruction::PushA(label) => write!(f, "PUSHA {label}"),
            Instruction::PushS(s) => write!(f, "PUSHS \"{s}\""),
            Instruction::StoreG(o) => write!(f, "STOREG {o}"),
            Instruction::StoreL(o) => write!(f, "STOREL {o}"),
            Instruction::Store(n) => write!(f, "STORE {n}"),
            Instruction::Load(n) => write!(f, "LOAD {n}"),
            Instruction::PAdd => write!(f, "PADD"),
            Instruction::Add => write!(f, "ADD"),
            Instruction::Sub => write!(f, "SUB"),
            Instruction::Mul => write!(f, "MUL"),
            Instruction::Div => write!(f, "DIV"),
            Instruction::Mod => write!(f, "MOD"),
            Instruction::Equal => write!(f, "EQUAL"),
            Instruction::Not => write!(f, "NOT"),
            Instruction::Inf => write!(f, "INF"),
            Instruction::Sup => write!(f, "SUP"),
            Instruction::InfEq => write!(f, "INFEQ"),
            Instruction::SupEq => write!(f, "SUPEQ"),
            Instruction::And => write!(f, "AND"),
            Instruction::Or => write!(f, "OR"),
            Instruction::Jump(label) => write!(f, "JUMP {label}"),
            Instruction::Jz(label) => write!(f, "JZ {label}"),
            Instruction::Call => write!(f, "CALL"),
            Instruction::Return => write!(f, "RETURN"),
            Instruction::Read => write!(f, "READ"),
            Instruction::Atoi => write!(f, "ATOI"),
            Instruction::WriteI => write!(f, "WRITEI"),
            Instruction::WriteS => write!(f, "WRITES"),
            Instruction::StrLen => write!(f, "STRLEN"),
            Instruction::CharAt => write!(f, "CHARAT"),
            Instruction::Start => write!(f, "START"),
            Instruction::Stop => write!(f, "STOP"),
            Instruction::Label(label) => write!(f, "{label}:"),
        }
    }
}
