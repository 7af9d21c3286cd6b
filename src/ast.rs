use serde::Serialize;
use std::fmt;
use std::rc::Rc;

use crate::source::Span;

/// A syntax-tree node: the variant payload plus the source span it covers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    #[serde(flatten)]
    pub kind: NodeKind,
    pub span: Span,
}

/// Every statement and expression form of the language.
///
/// Serializes internally tagged, so a record always carries its `kind`
/// discriminant next to the variant fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum NodeKind {
    Program {
        body: Vec<Node>,
    },
    VariableDecl {
        identifier: String,
        value: Option<Box<Node>>,
        constant: bool,
    },
    FunctionDecl {
        name: String,
        parameters: Vec<String>,
        // Shared with every Function value created from this declaration
        body: Rc<[Node]>,
    },
    Identifier {
        symbol: String,
    },
    NumericLiteral {
        value: f64,
    },
    BinaryExpr {
        left: Box<Node>,
        right: Box<Node>,
        operator: BinaryOperator,
    },
    AssignmentExpr {
        assignee: Box<Node>,
        value: Box<Node>,
    },
    ObjectLiteral {
        properties: Vec<PropertyLiteral>,
    },
    CallExpr {
        caller: Box<Node>,
        arguments: Vec<Node>,
    },
    MemberExpr {
        object: Box<Node>,
        property: Box<Node>,
        computed: bool,
    },
}

/// One `key` or `key: value` entry of an object literal.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename = "PropertyLiteral")]
pub struct PropertyLiteral {
    pub key: String,
    pub value: Option<Box<Node>>,
    pub span: Span,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum BinaryOperator {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Subtract,
    #[serde(rename = "*")]
    Multiply,
    #[serde(rename = "/")]
    Divide,
    #[serde(rename = "%")]
    Modulo,
}

impl BinaryOperator {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "+" => Some(BinaryOperator::Add),
            "-" => Some(BinaryOperator::Subtract),
            "*" => Some(BinaryOperator::Multiply),
            "/" => Some(BinaryOperator::Divide),
            "%" => Some(BinaryOperator::Modulo),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
        }
    }

    pub fn is_additive(self) -> bool {
        matches!(self, BinaryOperator::Add | BinaryOperator::Subtract)
    }

    pub fn is_multiplicative(self) -> bool {
        !self.is_additive()
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl Node {
    pub fn new(kind: NodeKind, span: Span) -> Self {
        Node { kind, span }
    }

    pub fn new_identifier(symbol: impl Into<String>, span: Span) -> Self {
        Node::new(
            NodeKind::Identifier {
                symbol: symbol.into(),
            },
            span,
        )
    }

    pub fn new_number(value: f64, span: Span) -> Self {
        Node::new(NodeKind::NumericLiteral { value }, span)
    }

    pub fn new_binary(left: Node, operator: BinaryOperator, right: Node) -> Self {
        let span = left.span.merge(right.span);
        Node::new(
            NodeKind::BinaryExpr {
                left: Box::new(left),
                right: Box::new(right),
                operator,
            },
            span,
        )
    }

    /// The discriminant name, as it appears in the structured record.
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            NodeKind::Program { .. } => "Program",
            NodeKind::VariableDecl { .. } => "VariableDecl",
            NodeKind::FunctionDecl { .. } => "FunctionDecl",
            NodeKind::Identifier { .. } => "Identifier",
            NodeKind::NumericLiteral { .. } => "NumericLiteral",
            NodeKind::BinaryExpr { .. } => "BinaryExpr",
            NodeKind::AssignmentExpr { .. } => "AssignmentExpr",
            NodeKind::ObjectLiteral { .. } => "ObjectLiteral",
            NodeKind::CallExpr { .. } => "CallExpr",
            NodeKind::MemberExpr { .. } => "MemberExpr",
        }
    }

    /// Converts the tree rooted here into a plain nested record.
    pub fn to_record(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

// Source-like rendering, mostly useful for tests and the REPL's `--ast` peers.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            NodeKind::Program { body } => {
                let mut first = true;
                for stmt in body {
                    if !first {
                        writeln!(f)?;
                    }
                    write!(f, "{}", stmt)?;
                    first = false;
                }
                Ok(())
            }
            NodeKind::VariableDecl {
                identifier,
                value,
                constant,
            } => {
                let keyword = if *constant { "const" } else { "let" };
                match value {
                    Some(value) => write!(f, "{} {} = {};", keyword, identifier, value),
                    None => write!(f, "{} {};", keyword, identifier),
                }
            }
            NodeKind::FunctionDecl {
                name,
                parameters,
                body,
            } => {
                write!(f, "fn {}({}) {{", name, parameters.join(", "))?;
                for stmt in body.iter() {
                    write!(f, " {}", stmt)?;
                }
                write!(f, " }}")
            }
            NodeKind::Identifier { symbol } => write!(f, "{}", symbol),
            NodeKind::NumericLiteral { value } => write!(f, "{}", value),
            NodeKind::BinaryExpr {
                left,
                right,
                operator,
            } => write!(f, "({} {} {})", left, operator, right),
            NodeKind::AssignmentExpr { assignee, value } => {
                write!(f, "({} = {})", assignee, value)
            }
            NodeKind::ObjectLiteral { properties } => {
                write!(f, "{{")?;
                for (i, property) in properties.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    match &property.value {
                        Some(value) => write!(f, " {}: {}", property.key, value)?,
                        None => write!(f, " {}", property.key)?,
                    }
                }
                write!(f, " }}")
            }
            NodeKind::CallExpr { caller, arguments } => {
                write!(f, "{}(", caller)?;
                for (i, argument) in arguments.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", argument)?;
                }
                write!(f, ")")
            }
            NodeKind::MemberExpr {
                object,
                property,
                computed,
            } => {
                if *computed {
                    write!(f, "{}[{}]", object, property)
                } else {
                    write!(f, "{}.{}", object, property)
                }
            }
        }
    }
}
