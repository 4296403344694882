// Copyright 2023-2024 The Regents of the University of California
// Copyright 2024-2025 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>
//
// Streaming VCD parser: a header pass that collects declarations followed by
// a body pass that collects timestamped value changes. Individual malformed
// lines are skipped with a warning; only input that does not look like a VCD
// at all is rejected.

use crate::lines::LineCursor;
use crate::trace::{Bit, ParseWarning, SignalType, SignalValue, Trace, TraceBuilder};
use crate::{DecodeError, Result};

/// Top-level commands whose presence identifies a value change dump.
const VCD_MARKERS: [&str; 4] = ["$timescale", "$var", "$scope", "$enddefinitions"];

/// Decodes raw file bytes into a [`Trace`].
///
/// The input is decoded as UTF-8 with lossy replacement. Inputs that contain
/// none of the commands in [`VCD_MARKERS`] fail with [`DecodeError::NotATrace`];
/// everything else produces a trace, possibly empty and possibly carrying
/// warnings.
pub fn decode(bytes: &[u8]) -> Result<Trace> {
    let text = String::from_utf8_lossy(bytes);
    if !VCD_MARKERS.iter().any(|marker| text.contains(marker)) {
        return Err(DecodeError::NotATrace);
    }
    let mut cursor = LineCursor::new(&text);
    let mut builder = TraceBuilder::new();
    parse_header(&mut cursor, &mut builder);
    parse_body(&mut cursor, &mut builder);
    Ok(builder.finish())
}

fn parse_header(cursor: &mut LineCursor, builder: &mut TraceBuilder) {
    let mut terminated = false;
    while let Some(line) = cursor.next() {
        if line.starts_with("$enddefinitions") {
            terminated = true;
            break;
        } else if line.starts_with("$scope") {
            parse_scope(line, cursor.line_no(), builder);
        } else if line.starts_with("$upscope") {
            builder.pop_scope();
        } else if line.starts_with("$var") {
            parse_var(line, cursor, builder);
        } else if line.starts_with("$timescale") {
            let raw = read_command_body(line, "$timescale", cursor);
            set_timescale(&raw, builder);
        } else if line.starts_with("$comment") {
            let body = read_command_body(line, "$comment", cursor);
            builder.set_comment(body);
        } else if line.starts_with("$date") {
            let body = read_command_body(line, "$date", cursor);
            builder.set_date(body);
        } else if line.starts_with("$version") {
            let body = read_command_body(line, "$version", cursor);
            builder.set_version(body);
        } else if line.starts_with('$') {
            builder.warn(ParseWarning::UnexpectedCommand {
                line_no: cursor.line_no(),
                command: first_token(line).to_string(),
            });
        } else {
            builder.warn(ParseWarning::MalformedDeclaration {
                line_no: cursor.line_no(),
                line: line.to_string(),
            });
        }
    }
    if !terminated {
        builder.warn(ParseWarning::HeaderNotTerminated);
    }
}

/// `$scope <type> <name> [$end]`
fn parse_scope(line: &str, line_no: u32, builder: &mut TraceBuilder) {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    match (tokens.get(1), tokens.get(2)) {
        (Some(tpe), Some(name)) if *name != "$end" => builder.push_scope(tpe, name),
        _ => builder.warn(ParseWarning::MalformedDeclaration {
            line_no,
            line: line.to_string(),
        }),
    }
}

/// `$var <type> <width> <symbol> <name...> [$end]`
///
/// The name may span several tokens (`data [7:0]`). A trailing `$end` is
/// accepted on the same line, alone on the next line, or not at all.
fn parse_var(line: &str, cursor: &mut LineCursor, builder: &mut TraceBuilder) {
    let line_no = cursor.line_no();
    let mut tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.last() == Some(&"$end") {
        tokens.pop();
    } else if cursor.peek() == Some("$end") {
        cursor.next();
    }

    let (tpe_token, width_token, symbol) = match (tokens.get(1), tokens.get(2), tokens.get(3)) {
        (Some(tpe), Some(width), Some(symbol)) => (*tpe, *width, *symbol),
        _ => {
            builder.warn(ParseWarning::MalformedDeclaration {
                line_no,
                line: line.to_string(),
            });
            return;
        }
    };

    let width = match width_token.parse::<u32>() {
        Ok(width) if width > 0 => width,
        _ => {
            builder.warn(ParseWarning::MalformedDeclaration {
                line_no,
                line: line.to_string(),
            });
            return;
        }
    };

    let tpe = match SignalType::from_token(tpe_token) {
        Some(tpe) => tpe,
        None => {
            log::debug!("[vcd] line {line_no}: unknown var type `{tpe_token}`, treating as wire");
            SignalType::Wire
        }
    };

    // everything after the symbol is the display name; a declaration without
    // one falls back to the symbol itself
    let name = if tokens.len() > 4 {
        tokens[4..].join(" ")
    } else {
        symbol.to_string()
    };
    builder.add_signal(tpe, width, symbol, &name);
}

fn set_timescale(raw: &str, builder: &mut TraceBuilder) {
    let normalized: String = raw.split_whitespace().collect();
    let digits = normalized.len() - normalized.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    let unit = &normalized[digits..];
    if digits > 0 && !unit.is_empty() && unit.chars().all(|c| c.is_ascii_alphabetic()) {
        builder.set_timescale(normalized);
    } else {
        builder.warn(ParseWarning::UnparsableTimescale {
            text: raw.to_string(),
        });
        builder.set_timescale("1ns".to_string());
    }
}

/// Collects the body of a `$comment` / `$date` / `$version` / `$timescale`
/// command. The content may share the command's line or span the following
/// lines until `$end`; a missing `$end` degrades to whatever was collected.
fn read_command_body(first_line: &str, command: &str, cursor: &mut LineCursor) -> String {
    let rest = first_line[command.len()..].trim();
    if let Some(end) = rest.find("$end") {
        return rest[..end].trim().to_string();
    }
    let mut content = String::from(rest);
    while let Some(line) = cursor.next() {
        if let Some(end) = line.find("$end") {
            if !content.is_empty() && end > 0 {
                content.push(' ');
            }
            content.push_str(line[..end].trim());
            break;
        }
        if !content.is_empty() {
            content.push(' ');
        }
        content.push_str(line);
    }
    content.trim().to_string()
}

fn parse_body(cursor: &mut LineCursor, builder: &mut TraceBuilder) {
    let mut current_time = 0u64;
    while let Some(line) = cursor.next() {
        match line.as_bytes()[0] {
            b'#' => {
                let token = &line[1..];
                match token.parse::<u64>() {
                    Ok(time) => {
                        current_time = time;
                        builder.observe_time(time);
                    }
                    Err(_) => builder.warn(ParseWarning::MalformedTimestamp {
                        line_no: cursor.line_no(),
                        token: token.to_string(),
                    }),
                }
            }
            b'$' => parse_body_command(line, cursor, builder),
            b'b' | b'B' => match split_payload(&line[1..], is_vector_digit) {
                Some((digits, symbol)) => builder.add_change(
                    current_time,
                    symbol,
                    SignalValue::Vector(digits.to_string()),
                ),
                None => builder.warn(ParseWarning::MalformedValueChange {
                    line_no: cursor.line_no(),
                    line: line.to_string(),
                }),
            },
            b'r' | b'R' => match split_payload(&line[1..], is_real_char)
                .and_then(|(digits, symbol)| Some((digits.parse::<f64>().ok()?, symbol)))
            {
                Some((value, symbol)) => {
                    builder.add_change(current_time, symbol, SignalValue::Real(value))
                }
                None => builder.warn(ParseWarning::MalformedValueChange {
                    line_no: cursor.line_no(),
                    line: line.to_string(),
                }),
            },
            _ => parse_scalar_change(line, current_time, cursor.line_no(), builder),
        }
    }
}

/// Commands that legitimately appear between value changes are skipped
/// without diagnostics; anything else unexpected in the body is a warning.
fn parse_body_command(line: &str, cursor: &mut LineCursor, builder: &mut TraceBuilder) {
    let command = first_token(line);
    match command {
        "$comment" => {
            let _ = read_command_body(line, "$comment", cursor);
        }
        "$dumpvars" | "$dumpall" | "$dumpon" | "$dumpoff" | "$end" => {}
        _ => builder.warn(ParseWarning::UnexpectedCommand {
            line_no: cursor.line_no(),
            command: command.to_string(),
        }),
    }
}

/// `<value><symbol>` with `value` one of `0 1 x z X Z`.
fn parse_scalar_change(line: &str, time: u64, line_no: u32, builder: &mut TraceBuilder) {
    let mut chars = line.chars();
    let value = chars.next().and_then(Bit::from_char);
    let symbol = chars.as_str().trim();
    match value {
        Some(bit) if !symbol.is_empty() && !symbol.contains(char::is_whitespace) => {
            builder.add_change(time, symbol, SignalValue::Scalar(bit));
        }
        _ => builder.warn(ParseWarning::MalformedValueChange {
            line_no,
            line: line.to_string(),
        }),
    }
}

fn is_vector_digit(c: char) -> bool {
    matches!(c, '0' | '1' | 'x' | 'z' | 'X' | 'Z' | '*' | '-')
}

fn is_real_char(c: char) -> bool {
    c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-')
}

/// Splits a `b`/`r` payload into the value digits and the symbol.
///
/// With a separating space the split is at the first whitespace run. Without
/// one the digits are the longest valid prefix and the remainder is the
/// symbol, which resolves lines like `b1010!` emitted without a delimiter.
fn split_payload(payload: &str, is_digit: fn(char) -> bool) -> Option<(&str, &str)> {
    let (digits, symbol) = match payload.find(char::is_whitespace) {
        Some(pos) => (&payload[..pos], payload[pos..].trim()),
        None => {
            let digit_len = payload
                .char_indices()
                .find(|(_, c)| !is_digit(*c))
                .map(|(ii, _)| ii)
                .unwrap_or(payload.len());
            (&payload[..digit_len], &payload[digit_len..])
        }
    };
    let valid = !digits.is_empty()
        && digits.chars().all(is_digit)
        && !symbol.is_empty()
        && !symbol.contains(char::is_whitespace);
    if valid {
        Some((digits, symbol))
    } else {
        None
    }
}

#[inline]
fn first_token(line: &str) -> &str {
    line.split_whitespace().next().unwrap_or(line)
}
