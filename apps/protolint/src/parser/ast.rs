//! Syntax tree for protocol buffer schema files.
//!
//! Block nodes keep their children in source order. Option values and
//! reserved ranges are kept as raw text; nothing here resolves types.

use super::meta::{Meta, Position};

/// A parsed `.proto` document.
#[derive(Debug, Clone, PartialEq)]
pub struct Proto {
    /// Path the document was parsed from, used verbatim in positions.
    pub filename: String,
    pub source: String,
    pub body: Vec<ProtoBody>,
    pub comments: Vec<Comment>,
}

impl Proto {
    pub fn syntax(&self) -> Option<&Syntax> {
        self.body.iter().find_map(|item| match item {
            ProtoBody::Syntax(s) => Some(s),
            _ => None,
        })
    }

    /// Every enum in the document, nested ones included, in source order.
    pub fn enums(&self) -> Vec<&Enum> {
        let mut out = Vec::new();
        for item in &self.body {
            match item {
                ProtoBody::Enum(e) => out.push(e),
                ProtoBody::Message(m) => collect_enums(&m.body, &mut out),
                _ => {}
            }
        }
        out
    }
}

fn collect_enums<'a>(body: &'a [MessageBody], out: &mut Vec<&'a Enum>) {
    for item in body {
        match item {
            MessageBody::Enum(e) => out.push(e),
            MessageBody::Message(m) => collect_enums(&m.body, out),
            MessageBody::Group(g) => collect_enums(&g.body, out),
            _ => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProtoBody {
    Syntax(Syntax),
    Edition(Edition),
    Package(Package),
    Import(Import),
    Option(OptionStmt),
    Message(Message),
    Enum(Enum),
    Service(Service),
    Extend(Extend),
    Empty(EmptyStatement),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub raw: String,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Syntax {
    pub proto_version: String,
    pub meta: Meta,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edition {
    pub edition: String,
    pub meta: Meta,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub name: String,
    pub meta: Meta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportModifier {
    Weak,
    Public,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub modifier: Option<ImportModifier>,
    pub location: String,
    pub meta: Meta,
}

/// `option name = constant;`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionStmt {
    pub name: String,
    pub constant: String,
    pub meta: Meta,
}

/// `[name = constant]` entry on a field or enum value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldOption {
    pub name: String,
    pub constant: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub name: String,
    pub body: Vec<MessageBody>,
    pub meta: Meta,
}

/// A statement inside a message, oneof, group, or extend body.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageBody {
    Field(Field),
    MapField(MapField),
    Oneof(Oneof),
    Message(Message),
    Enum(Enum),
    Extend(Extend),
    Option(OptionStmt),
    Reserved(Reserved),
    Extensions(Extensions),
    Group(Group),
    Empty(EmptyStatement),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub label: Option<String>,
    pub type_name: String,
    pub name: String,
    pub number: String,
    pub options: Vec<FieldOption>,
    pub meta: Meta,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapField {
    pub key_type: String,
    pub value_type: String,
    pub name: String,
    pub number: String,
    pub options: Vec<FieldOption>,
    pub meta: Meta,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Oneof {
    pub name: String,
    pub body: Vec<MessageBody>,
    pub meta: Meta,
}

/// Legacy proto2 `group` declaration; owns a message-like body.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub label: Option<String>,
    pub name: String,
    pub number: String,
    pub options: Vec<FieldOption>,
    pub body: Vec<MessageBody>,
    pub meta: Meta,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Extend {
    pub message_type: String,
    pub body: Vec<MessageBody>,
    pub meta: Meta,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reserved {
    pub ranges: Vec<String>,
    pub field_names: Vec<String>,
    pub meta: Meta,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extensions {
    pub ranges: Vec<String>,
    pub options: Vec<FieldOption>,
    pub meta: Meta,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enum {
    pub name: String,
    pub body: Vec<EnumBody>,
    pub meta: Meta,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumBody {
    Field(EnumField),
    Option(OptionStmt),
    Reserved(Reserved),
    Empty(EmptyStatement),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumField {
    pub ident: String,
    pub number: String,
    pub options: Vec<FieldOption>,
    pub meta: Meta,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    pub name: String,
    pub body: Vec<ServiceBody>,
    pub meta: Meta,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceBody {
    Rpc(Rpc),
    Option(OptionStmt),
    Empty(EmptyStatement),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcType {
    pub stream: bool,
    pub message_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rpc {
    pub name: String,
    pub request: RpcType,
    pub response: RpcType,
    pub body: Vec<RpcBody>,
    /// Whether the rpc was written with a `{ ... }` body rather than `;`.
    pub has_body: bool,
    pub meta: Meta,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpcBody {
    Option(OptionStmt),
    Empty(EmptyStatement),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmptyStatement {
    pub meta: Meta,
}
