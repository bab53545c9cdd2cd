//! Command handler boundary.
//!
//! The worker loop hands the raw request bytes to a [`CommandHandler`] and
//! publishes whatever it writes into the response buffer. The stock handler is
//! [`CapabilityTable`], which decodes a space-delimited command line and
//! forwards it to a registered capability. The capabilities themselves belong
//! to whatever driver the embedding program links against; this module only
//! fixes their shape (name, argument kinds, scalar result).

use std::collections::HashMap;
use std::fmt;
use std::io::Write;

use tracing::warn;

use crate::error::CommandError;

/// Prefix of every error response.
pub const ERROR_MARKER: &str = "error:";

/// Response text for a capability that returns nothing.
pub const VOID_RESPONSE: &str = "0";

/// Turns one request into one response.
///
/// Implementations write the response into `response`, which arrives empty
/// and is reused across requests. Returning an error makes the worker publish
/// `error: <message>` instead.
pub trait CommandHandler: Send {
    fn handle(&mut self, request: &[u8], response: &mut Vec<u8>) -> Result<(), CommandError>;
}

impl<F> CommandHandler for F
where
    F: FnMut(&[u8], &mut Vec<u8>) -> Result<(), CommandError> + Send,
{
    fn handle(&mut self, request: &[u8], response: &mut Vec<u8>) -> Result<(), CommandError> {
        self(request, response)
    }
}

/// Render a command error as the text placed in the response buffer.
pub fn error_response(err: &CommandError) -> String {
    format!("{} {}", ERROR_MARKER, err)
}

/// Whether a response carries an error.
pub fn is_error_response(response: &[u8]) -> bool {
    response.starts_with(ERROR_MARKER.as_bytes())
}

/// Kind of one positional argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    /// 32-bit signed integer.
    Int,
    /// 64-bit signed integer.
    Long,
    /// 64-bit float.
    Float,
    /// One token, taken verbatim.
    Str,
    /// Every remaining token joined by single spaces. Must come last.
    Rest,
}

impl ArgKind {
    fn name(self) -> &'static str {
        match self {
            ArgKind::Int => "int",
            ArgKind::Long => "long",
            ArgKind::Float => "float",
            ArgKind::Str => "string",
            ArgKind::Rest => "text",
        }
    }

    fn parse(self, token: &str) -> Option<Arg> {
        match self {
            ArgKind::Int => token.parse().ok().map(Arg::Int),
            ArgKind::Long => token.parse().ok().map(Arg::Long),
            ArgKind::Float => token.parse().ok().map(Arg::Float),
            ArgKind::Str | ArgKind::Rest => Some(Arg::Str(token.to_string())),
        }
    }
}

/// A decoded argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Int(i32),
    Long(i64),
    Float(f64),
    Str(String),
}

impl Arg {
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Arg::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            Arg::Long(v) => Some(*v),
            Arg::Int(v) => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Arg::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Arg::Str(v) => Some(v),
            _ => None,
        }
    }
}

/// Scalar result of a capability.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Str(v) => f.write_str(v),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

type Operation = Box<dyn Fn(&[Arg]) -> Result<Option<Value>, String> + Send>;

/// One named operation of the external driver.
pub struct Capability {
    params: Vec<ArgKind>,
    op: Operation,
}

impl Capability {
    pub fn params(&self) -> &[ArgKind] {
        &self.params
    }

    fn decode(&self, name: &str, tokens: &[&str]) -> Result<Vec<Arg>, CommandError> {
        let variadic = self.params.last() == Some(&ArgKind::Rest);
        let fixed = if variadic {
            self.params.len() - 1
        } else {
            self.params.len()
        };

        if variadic && tokens.len() < fixed {
            return Err(CommandError::TooFewArguments {
                name: name.to_string(),
                min: fixed,
                actual: tokens.len(),
            });
        }
        if !variadic && tokens.len() != fixed {
            return Err(CommandError::Arity {
                name: name.to_string(),
                expected: fixed,
                actual: tokens.len(),
            });
        }

        let mut args = Vec::with_capacity(self.params.len());
        for (index, (kind, token)) in self.params[..fixed].iter().zip(tokens).enumerate() {
            let arg = kind.parse(token).ok_or_else(|| CommandError::InvalidArgument {
                name: name.to_string(),
                index: index + 1,
                kind: kind.name(),
                token: token.to_string(),
            })?;
            args.push(arg);
        }
        if variadic {
            args.push(Arg::Str(tokens[fixed..].join(" ")));
        }
        Ok(args)
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capability")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Split a command line on single spaces, dropping empty tokens.
pub fn tokenize(line: &str) -> Vec<&str> {
    line.split(' ').filter(|t| !t.is_empty()).collect()
}

/// Map from command name to driver capability.
#[derive(Debug, Default)]
pub struct CapabilityTable {
    capabilities: HashMap<String, Capability>,
    list_command: bool,
}

impl CapabilityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with the built-in diagnostic commands:
    /// `ping`, `echo <text>`, `pid` and `commands`.
    pub fn with_diagnostics() -> Self {
        let mut table = Self::new();
        table.register("ping", &[], |_| Ok(Some(Value::from("pong"))));
        table.register("echo", &[ArgKind::Rest], |args| {
            Ok(args[0].as_str().map(Value::from))
        });
        table.register("pid", &[], |_| Ok(Some(Value::Int(std::process::id() as i64))));
        table.list_command = true;
        table
    }

    /// Register (or replace) a capability.
    ///
    /// # Panics
    /// If `ArgKind::Rest` appears anywhere but last in `params`.
    pub fn register<F>(&mut self, name: &str, params: &[ArgKind], op: F) -> &mut Self
    where
        F: Fn(&[Arg]) -> Result<Option<Value>, String> + Send + 'static,
    {
        assert!(
            !params
                .iter()
                .rev()
                .skip(1)
                .any(|kind| *kind == ArgKind::Rest),
            "ArgKind::Rest must be the last parameter of {}",
            name
        );
        self.capabilities.insert(
            name.to_string(),
            Capability {
                params: params.to_vec(),
                op: Box::new(op),
            },
        );
        self
    }

    pub fn get(&self, name: &str) -> Option<&Capability> {
        self.capabilities.get(name)
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    /// Registered command names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.capabilities.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Decode and run one command line, returning the response text.
    pub fn dispatch(&self, line: &str) -> Result<String, CommandError> {
        let tokens = tokenize(line);
        let (name, rest) = tokens.split_first().ok_or(CommandError::Empty)?;

        if self.list_command && *name == "commands" {
            return Ok(self.names().join(" "));
        }

        let capability = self.capabilities.get(*name).ok_or_else(|| {
            warn!(command = *name, "Unknown command");
            CommandError::UnknownCommand(name.to_string())
        })?;

        let args = capability.decode(name, rest)?;
        match (capability.op)(&args) {
            Ok(Some(value)) => Ok(value.to_string()),
            Ok(None) => Ok(VOID_RESPONSE.to_string()),
            Err(message) => Err(CommandError::Driver {
                name: name.to_string(),
                message,
            }),
        }
    }
}

impl CommandHandler for CapabilityTable {
    fn handle(&mut self, request: &[u8], response: &mut Vec<u8>) -> Result<(), CommandError> {
        let line = std::str::from_utf8(request).map_err(|_| CommandError::Decode)?;
        let line = line.trim_end_matches(['\0', '\r', '\n']);
        let text = self.dispatch(line)?;
        response
            .write_all(text.as_bytes())
            .map_err(|e| CommandError::ProtocolViolation(e.to_string()))
    }
}
