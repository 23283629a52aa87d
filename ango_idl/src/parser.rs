/*
Grammar for the service definition format. One statement per line.

// x? means x zero or one time
// x* means x zero or more times
// x | y means x or y
// "abcd" means literal string "abcd"
// ws means one or more spaces or tabs, ws? means optional ws

// root terminal
definition-file := name-statement ( newline statement? )*
statement := procedure-statement | type-statement

name-statement := "name" ws identifier

procedure-statement := ( "server" | "client" ) ws ( "oneway" ws )? identifier ws? param-group ws? param-group?
param-group := "(" ( param ( "," param )* )? ")"
param := ws? identifier ws param-type ws?
param-type := "int" | "int8" | "int16" | "int32" | "int64"
            | "uint" | "uint8" | "uint16" | "uint32" | "uint64" | "string"

type-statement := "type" ws identifier ws type-expression
type-expression := identifier                          // simple
                 | "[]" identifier                     // slice
                 | "map[" identifier "]" identifier    // map
                 | "struct" ws? "{"                    // struct, rejected

identifier := a lowercase ASCII letter followed by zero or more ASCII letters or digits.

Blank lines are skipped and trailing whitespace is ignored. Every other line
must be one of the statements above. Types must be declared before they are
referenced.
*/

use std::collections::hash_map::Entry;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use nom::{
    branch::alt,
    bytes::complete::{tag, take_till, take_while, take_while1},
    character::complete::{char, satisfy, space0, space1},
    combinator::{all_consuming, map, opt, recognize, rest, value},
    sequence::{delimited, pair, preceded, separated_pair, tuple},
    IResult,
};
use tracing::{debug, warn};

use crate::error::{ParseError, ParseErrorKind};
use crate::interface::{Direction, Identifier, Param, Procedure, Service, Source, Type, TypeKind};
use crate::line_reader::LineReader;
use crate::types::{builtin_type, lookup_builtin, Builtin};

/// Parses a complete service definition.
pub fn parse<R: BufRead>(reader: R) -> Result<Service, ParseError> {
    let result = ServiceParser {
        lines: LineReader::new(reader),
    }
    .run();
    match &result {
        Ok(service) => debug!(
            service = %service.name,
            server_procedures = service.server_procedures.len(),
            client_procedures = service.client_procedures.len(),
            types = service.types.len(),
            "parsed service definition"
        ),
        Err(e) => warn!("{e}"),
    }
    result
}

pub fn parse_str(input: &str) -> Result<Service, ParseError> {
    parse(input.as_bytes())
}

pub fn parse_file(path: impl AsRef<Path>) -> Result<Service, ParseError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        ParseError::new(ParseErrorKind::Reader, 0).with_detail(format!("{}: {e}", path.display()))
    })?;
    parse(BufReader::new(file))
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Statement {
    Blank,
    Procedure,
    Type,
    Unknown,
}

impl Statement {
    fn classify(line: &str) -> Self {
        if line.trim().is_empty() {
            return Statement::Blank;
        }
        match line.split([' ', '\t']).next() {
            Some("server") | Some("client") => Statement::Procedure,
            Some("type") => Statement::Type,
            _ => Statement::Unknown,
        }
    }
}

struct ServiceParser<R> {
    lines: LineReader<R>,
}

impl<R: BufRead> ServiceParser<R> {
    fn run(mut self) -> Result<Service, ParseError> {
        let mut service = Service::new(self.parse_name()?);

        loop {
            let upcoming_line = self.lines.line_number() + 1;
            let statement = match self.lines.peek() {
                Ok(None) => return Ok(service),
                Ok(Some(line)) => Statement::classify(line),
                Err(e) => return Err(reader_error(upcoming_line, e)),
            };
            let line = self.next_line()?.ok_or_else(|| {
                ParseError::new(ParseErrorKind::UnexpectedEof, upcoming_line)
            })?;
            let line_number = self.lines.line_number();

            match statement {
                Statement::Blank => (),
                Statement::Procedure => parse_procedure(&mut service, &line, line_number)?,
                Statement::Type => parse_type_definition(&mut service, &line, line_number)?,
                Statement::Unknown => {
                    return Err(ParseError::new(ParseErrorKind::UnknownStatement, line_number)
                        .with_detail(format!("\"{}\"", line.trim())));
                }
            }
        }
    }

    fn parse_name(&mut self) -> Result<Identifier, ParseError> {
        let line = self.next_line()?.ok_or_else(|| {
            ParseError::new(ParseErrorKind::UnexpectedEof, self.lines.line_number() + 1)
        })?;
        let parsed = all_consuming(name_statement)(line.trim_end());
        match parsed {
            Ok((_, name)) => Ok(Identifier::from(name)),
            Err(_) => Err(ParseError::new(
                ParseErrorKind::InvalidNameDefinition,
                self.lines.line_number(),
            )),
        }
    }

    fn next_line(&mut self) -> Result<Option<String>, ParseError> {
        let upcoming_line = self.lines.line_number() + 1;
        self.lines
            .line()
            .map_err(|e| reader_error(upcoming_line, e))
    }
}

fn reader_error(line: usize, e: io::Error) -> ParseError {
    ParseError::new(ParseErrorKind::Reader, line).with_detail(e.to_string())
}

struct ProcedureHeader<'a> {
    direction: Direction,
    oneway: bool,
    name: &'a str,
    args: &'a str,
    rets: Option<&'a str>,
}

fn parse_procedure(service: &mut Service, line: &str, line_number: usize) -> Result<(), ParseError> {
    let err = |kind| ParseError::new(kind, line_number);

    let header = match all_consuming(procedure_header)(line.trim_end()) {
        Ok((_, header)) => header,
        Err(_) => {
            return Err(err(ParseErrorKind::InvalidProcedureDefinition)
                .with_detail(format!("\"{}\"", line.trim())))
        }
    };

    if header.oneway && header.rets.is_some() {
        return Err(err(ParseErrorKind::UnexpectedReturnParameters)
            .with_detail(format!("\"{}\"", header.name)));
    }
    let args = parse_params(header.args, line_number)?;
    let rets = match header.rets {
        Some(group) => parse_params(group, line_number)?,
        None => Vec::new(),
    };
    if header.rets.is_some() && rets.is_empty() {
        return Err(err(ParseErrorKind::EmptyReturnGroup).with_detail(format!("\"{}\"", header.name)));
    }

    let procedure = Procedure {
        name: Identifier::from(header.name),
        direction: header.direction,
        oneway: header.oneway,
        args,
        rets,
        source: Source { line: line_number },
    };
    match service
        .procedures_mut(header.direction)
        .entry(procedure.name.clone())
    {
        Entry::Vacant(entry) => {
            debug!(direction = %header.direction, procedure = header.name, "registered procedure");
            entry.insert(procedure);
        }
        Entry::Occupied(entry) => {
            return Err(err(ParseErrorKind::DuplicateProcedureIdentifier)
                .with_detail(format!("\"{}\"", entry.key())));
        }
    }
    Ok(())
}

/// Parses the inside of a parenthesized parameter group.
fn parse_params(group: &str, line_number: usize) -> Result<Vec<Param>, ParseError> {
    if group.is_empty() {
        return Ok(Vec::new());
    }

    let mut params: Vec<Param> = Vec::new();
    for (i, text) in group.split(',').enumerate() {
        let position = i + 1;
        let invalid = |detail: String| {
            ParseError::new(ParseErrorKind::InvalidParameter, line_number)
                .with_detail(format!("at position {position}: {detail}"))
        };

        let (name, type_name) = match all_consuming(param)(text) {
            Ok((_, param)) => param,
            Err(_) => return Err(invalid(format!("\"{}\"", text.trim()))),
        };
        let ty = Builtin::from_name(type_name)
            .filter(|b| b.is_param_type())
            .map(builtin_type)
            .ok_or_else(|| invalid(format!("unknown type \"{type_name}\"")))?;
        if params.iter().any(|p| p.name.as_str() == name) {
            return Err(
                ParseError::new(ParseErrorKind::DuplicateParameterIdentifier, line_number)
                    .with_detail(format!("at position {position}: \"{name}\"")),
            );
        }
        params.push(Param {
            name: Identifier::from(name),
            ty,
        });
    }
    Ok(params)
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum TypeExpression<'a> {
    Simple(&'a str),
    Slice(&'a str),
    Map(&'a str, &'a str),
    Struct,
}

fn parse_type_definition(
    service: &mut Service,
    line: &str,
    line_number: usize,
) -> Result<(), ParseError> {
    let invalid = || ParseError::new(ParseErrorKind::InvalidTypeDefinition, line_number);

    let (name, expression) = match all_consuming(type_statement)(line.trim_end()) {
        Ok((_, statement)) => statement,
        Err(_) => return Err(invalid().with_detail(format!("\"{}\"", line.trim()))),
    };
    if lookup_builtin(name).is_some() {
        return Err(invalid().with_detail(format!("cannot redeclare builtin type `{name}`")));
    }
    if service.types.contains_key(name) {
        return Err(invalid().with_detail(format!("duplicate type `{name}`")));
    }

    let resolve = |type_name: &str, what: &str| {
        service
            .lookup_type(type_name)
            .ok_or_else(|| invalid().with_detail(format!("{what} `{type_name}`")))
    };
    let kind = match expression {
        TypeExpression::Simple(t) => TypeKind::Simple(resolve(t, "unknown type")?),
        TypeExpression::Slice(t) => TypeKind::Slice(resolve(t, "unknown element type")?),
        TypeExpression::Map(k, v) => TypeKind::Map {
            key: resolve(k, "unknown map key type")?,
            value: resolve(v, "unknown map value type")?,
        },
        TypeExpression::Struct => {
            return Err(invalid().with_detail("struct types are not supported"));
        }
    };

    debug!(name, "registered type");
    let name = Identifier::from(name);
    service
        .types
        .insert(name.clone(), Arc::new(Type { name, kind }));
    Ok(())
}

fn name_statement(input: &str) -> IResult<&str, &str> {
    preceded(pair(tag("name"), space1), identifier)(input)
}

fn procedure_header(input: &str) -> IResult<&str, ProcedureHeader<'_>> {
    let (input, (direction, _)) = pair(direction, space1)(input)?;
    // `oneway` without a name after it is the name of a two-way procedure.
    alt((
        map(
            preceded(pair(tag("oneway"), space1), signature),
            move |(name, args, rets)| ProcedureHeader {
                direction,
                oneway: true,
                name,
                args,
                rets,
            },
        ),
        map(signature, move |(name, args, rets)| ProcedureHeader {
            direction,
            oneway: false,
            name,
            args,
            rets,
        }),
    ))(input)
}

/// The procedure name, its argument group and the optional return group.
fn signature(input: &str) -> IResult<&str, (&str, &str, Option<&str>)> {
    map(
        tuple((identifier, space0, param_group, space0, opt(param_group))),
        |(name, _, args, _, rets)| (name, args, rets),
    )(input)
}

fn direction(input: &str) -> IResult<&str, Direction> {
    alt((
        value(Direction::Server, tag("server")),
        value(Direction::Client, tag("client")),
    ))(input)
}

/// Returns the text between the parentheses.
fn param_group(input: &str) -> IResult<&str, &str> {
    delimited(char('('), take_till(|c| c == '(' || c == ')'), char(')'))(input)
}

fn param(input: &str) -> IResult<&str, (&str, &str)> {
    delimited(
        space0,
        separated_pair(identifier, space1, take_while1(|c: char| c.is_ascii_alphanumeric())),
        space0,
    )(input)
}

fn type_statement(input: &str) -> IResult<&str, (&str, TypeExpression<'_>)> {
    preceded(
        pair(tag("type"), space1),
        separated_pair(identifier, space1, type_expression),
    )(input)
}

fn type_expression(input: &str) -> IResult<&str, TypeExpression<'_>> {
    alt((
        map(preceded(tag("[]"), identifier), TypeExpression::Slice),
        map(
            pair(delimited(tag("map["), identifier, char(']')), identifier),
            |(key, value)| TypeExpression::Map(key, value),
        ),
        value(
            TypeExpression::Struct,
            tuple((tag("struct"), space0, char('{'), rest)),
        ),
        map(identifier, TypeExpression::Simple),
    ))(input)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        satisfy(|c| c.is_ascii_lowercase()),
        take_while(|c: char| c.is_ascii_alphanumeric()),
    ))(input)
}
