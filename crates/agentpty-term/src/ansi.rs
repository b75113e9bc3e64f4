//! ANSI escape handling
//!
//! Removes CSI, OSC, DCS and the shorter escape families from PTY output,
//! along with carriage returns and other C0/C1 controls. Newlines and tabs
//! survive. A sequence that never terminates loses only its introducer; the
//! text after it is kept. [`split_complete`] instead withholds a sequence
//! that is still open at the end, so stripping a growing buffer chunk by
//! chunk only ever appends to the previous result.

use std::iter::Peekable;
use std::str::CharIndices;

const ESC: char = '\x1b';
const BEL: char = '\x07';
/// 8-bit control sequence introducer
const CSI: char = '\u{9b}';
/// 8-bit string terminator
const ST: char = '\u{9c}';

/// Parameter bytes accepted in one CSI before the introducer is given up on.
const MAX_CSI_LEN: usize = 64;

/// Payload accepted in one OSC/DCS/APC string without a terminator.
const MAX_STRING_LEN: usize = 4096;

type Chars<'a> = Peekable<CharIndices<'a>>;

/// Outcome of scanning one escape sequence.
enum Scan {
    /// Sequence consumed.
    Complete,
    /// Input ended inside the sequence.
    Incomplete,
    /// Not a sequence after all: drop the introducer, rescan what followed it.
    Abandoned,
}

/// Strip ANSI escape sequences from output.
///
/// Idempotent: the result contains no escape introducers or control
/// characters other than `\n` and `\t`.
#[must_use]
pub fn strip_ansi_escapes(s: &str) -> String {
    scan(s, true).0
}

/// Strip `input` up to the first unfinished escape sequence.
///
/// Returns the plain text and the byte offset where the unfinished tail
/// starts (`input.len()` when everything was consumed).
pub(crate) fn split_complete(input: &str) -> (String, usize) {
    scan(input, false)
}

/// With `at_end` set the input is final, so an unfinished sequence is
/// treated like an abandoned one.
fn scan(input: &str, at_end: bool) -> (String, usize) {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        let checkpoint = chars.clone();
        let scan = match c {
            ESC => match chars.next().map(|(_, next)| next) {
                None => Scan::Incomplete,
                Some('[') => skip_csi(&mut chars),
                Some(']' | 'P' | 'X' | '^' | '_') => skip_string(&mut chars),
                Some('\x20'..='\x2f') => skip_escape(&mut chars),
                // Two-character escapes: ESC 7, ESC =, ESC M, ...
                Some('\x30'..='\x7e') => Scan::Complete,
                Some(_) => Scan::Abandoned,
            },
            CSI => skip_csi(&mut chars),
            '\n' | '\t' => {
                out.push(c);
                continue;
            }
            c if c.is_control() => continue,
            c => {
                out.push(c);
                continue;
            }
        };

        match scan {
            Scan::Complete => {}
            Scan::Incomplete if !at_end => return (out, start),
            Scan::Incomplete | Scan::Abandoned => chars = checkpoint,
        }
    }

    (out, input.len())
}

/// CSI: parameter/intermediate bytes (0x20–0x3F) then one final byte (0x40–0x7E).
fn skip_csi(chars: &mut Chars<'_>) -> Scan {
    let mut len = 0usize;
    while let Some(&(_, c)) = chars.peek() {
        match c {
            '\x20'..='\x3f' => {
                chars.next();
                len += 1;
                if len > MAX_CSI_LEN {
                    return Scan::Abandoned;
                }
            }
            '\x40'..='\x7e' => {
                chars.next();
                return Scan::Complete;
            }
            // Malformed: the parameters read so far are dropped, the
            // offending character is kept for the caller.
            _ => return Scan::Complete,
        }
    }
    Scan::Incomplete
}

/// OSC/DCS/SOS/PM/APC: payload terminated by BEL or ST (`ESC \` or 0x9C).
fn skip_string(chars: &mut Chars<'_>) -> Scan {
    let mut len = 0usize;
    loop {
        let Some(&(_, c)) = chars.peek() else {
            return Scan::Incomplete;
        };
        match c {
            BEL | ST => {
                chars.next();
                return Scan::Complete;
            }
            ESC => {
                let mut lookahead = chars.clone();
                lookahead.next();
                return match lookahead.peek() {
                    None => Scan::Incomplete,
                    Some(&(_, '\\')) => {
                        chars.next();
                        chars.next();
                        Scan::Complete
                    }
                    // Unterminated string; this ESC opens the next sequence.
                    Some(_) => Scan::Complete,
                };
            }
            _ => {
                chars.next();
                len += 1;
                if len > MAX_STRING_LEN {
                    return Scan::Abandoned;
                }
            }
        }
    }
}

/// nF escapes such as charset designation: `ESC ( B`, `ESC # 8`.
fn skip_escape(chars: &mut Chars<'_>) -> Scan {
    while let Some(&(_, c)) = chars.peek() {
        match c {
            '\x20'..='\x2f' => {
                chars.next();
            }
            '\x30'..='\x7e' => {
                chars.next();
                return Scan::Complete;
            }
            _ => return Scan::Complete,
        }
    }
    Scan::Incomplete
}
