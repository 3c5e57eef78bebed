//! Extraction of scene code, narration and quiz questions from a model reply.
//!
//! A reply must contain three fenced blocks, in this order:
//!
//! ````text
//! ```python
//! <scene code>
//! ```
//! ```script
//! 0:00 - Welcome!
//! 0:05 - A triangle has three sides.
//! ```
//! ```mcq
//! [{"question": "...", "options": ["a", "b", "c", "d"], "correctAnswer": "a"}]
//! ```
//! ````
//!
//! An opening fence is a line starting with three backticks followed by a tag;
//! the block ends at the next line that is exactly three backticks. Blocks with
//! other tags (or none) are skipped. Script lines that do not look like
//! `m:ss - text` are dropped, while the quiz block must be valid JSON.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{EdureelError, Result};

const FENCE: &str = "```";

/// Tags of the required blocks, in the order they must appear.
const REQUIRED_TAGS: [&str; 3] = ["python", "script", "mcq"];

static SCRIPT_LINE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^(\d+:\d+)\s*-\s*(.*)$").ok());

/// A multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mcq {
    /// Question text.
    pub question: String,
    /// Answer options, normally four.
    pub options: Vec<String>,
    /// The correct option.
    pub correct_answer: String,
}

impl Mcq {
    /// Returns `true` if there are four options and one of them is the answer.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.options.len() == 4 && self.options.contains(&self.correct_answer)
    }
}

/// One line of narration and when it starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrationLine {
    /// Start time within the video, in seconds.
    pub offset_seconds: u32,
    /// Text to speak.
    pub text: String,
}

/// Everything usable in one model reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedPayload {
    /// Scene source code.
    pub code: String,
    /// Timed narration, in script order.
    pub narration: Vec<NarrationLine>,
    /// Quiz questions.
    pub questions: Vec<Mcq>,
}

impl ExtractedPayload {
    /// All narration text joined with single spaces.
    #[must_use]
    pub fn caption(&self) -> String {
        self.narration
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug)]
struct FencedBlock<'a> {
    tag: String,
    body: Vec<&'a str>,
}

/// Splits `reply` into fenced blocks.
fn scan_fences(reply: &str) -> Result<Vec<FencedBlock<'_>>> {
    let mut blocks = Vec::new();
    let mut open: Option<(usize, FencedBlock<'_>)> = None;

    for (number, line) in reply.lines().enumerate() {
        let trimmed = line.trim();
        if open.is_some() {
            if trimmed == FENCE {
                if let Some((_, block)) = open.take() {
                    blocks.push(block);
                }
            } else if let Some((_, block)) = open.as_mut() {
                block.body.push(line);
            }
        } else if let Some(rest) = trimmed.strip_prefix(FENCE) {
            let tag = rest
                .split_whitespace()
                .next()
                .unwrap_or_default()
                .to_lowercase();
            open = Some((number + 1, FencedBlock { tag, body: Vec::new() }));
        }
    }

    if let Some((line, block)) = open {
        let tag = if block.tag.is_empty() { "untagged" } else { block.tag.as_str() };
        return Err(EdureelError::extraction(format!(
            "{tag} block opened on line {line} is never closed"
        )));
    }

    Ok(blocks)
}

/// Picks the required blocks out of `blocks`, enforcing count and order.
fn required_sections(blocks: Vec<FencedBlock<'_>>) -> Result<[String; 3]> {
    let found: Vec<FencedBlock<'_>> = blocks
        .into_iter()
        .filter(|b| REQUIRED_TAGS.contains(&b.tag.as_str()))
        .collect();

    for tag in REQUIRED_TAGS {
        match found.iter().filter(|b| b.tag == tag).count() {
            0 => return Err(EdureelError::extraction(format!("missing ```{tag} block"))),
            1 => {}
            n => {
                return Err(EdureelError::extraction(format!(
                    "expected one ```{tag} block, found {n}"
                )))
            }
        }
    }

    let order: Vec<&str> = found.iter().map(|b| b.tag.as_str()).collect();
    if order != REQUIRED_TAGS {
        return Err(EdureelError::extraction(format!(
            "blocks must appear in the order python, script, mcq; found {}",
            order.join(", ")
        )));
    }

    let mut bodies = found.into_iter().map(|b| b.body.join("\n"));
    match (bodies.next(), bodies.next(), bodies.next()) {
        (Some(code), Some(script), Some(mcq)) => Ok([code, script, mcq]),
        _ => Err(EdureelError::extraction("missing required blocks")),
    }
}

/// Converts `minutes:seconds` into seconds. Seconds of 60 or more are
/// accepted as written.
#[must_use]
pub fn parse_timestamp(ts: &str) -> Option<u32> {
    let (minutes, seconds) = ts.trim().split_once(':')?;
    if minutes.is_empty() || seconds.is_empty() {
        return None;
    }
    if !minutes.bytes().chain(seconds.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }
    let minutes: u32 = minutes.parse().ok()?;
    let seconds: u32 = seconds.parse().ok()?;
    minutes.checked_mul(60)?.checked_add(seconds)
}

/// Parses narration lines of the form `m:ss - text`.
///
/// Lines that do not match, or whose text is blank, are skipped.
#[must_use]
pub fn parse_script(raw: &str) -> Vec<NarrationLine> {
    let Some(pattern) = SCRIPT_LINE.as_ref() else {
        return Vec::new();
    };

    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let parsed = pattern.captures(line).and_then(|caps| {
                let offset_seconds = parse_timestamp(caps.get(1)?.as_str())?;
                let text = caps.get(2)?.as_str().trim();
                (!text.is_empty()).then(|| NarrationLine {
                    offset_seconds,
                    text: text.to_string(),
                })
            });
            if parsed.is_none() {
                debug!(line, "Skipping script line");
            }
            parsed
        })
        .collect()
}

/// Parses the quiz block as a JSON array of questions.
pub fn parse_mcqs(raw: &str) -> Result<Vec<Mcq>> {
    let questions: Vec<Mcq> = serde_json::from_str(raw.trim())
        .map_err(|e| EdureelError::extraction(format!("invalid mcq JSON: {e}")))?;

    if questions.is_empty() {
        return Err(EdureelError::extraction("mcq block contains no questions"));
    }

    for (i, mcq) in questions.iter().enumerate() {
        if !mcq.is_consistent() {
            warn!(
                index = i,
                options = mcq.options.len(),
                "Question does not have four options including the correct answer"
            );
        }
    }

    Ok(questions)
}

/// Extracts code, narration and questions from a model reply.
///
/// Fails as a whole if any section is missing, duplicated, out of order,
/// unterminated or empty.
pub fn extract_payload(reply: &str) -> Result<ExtractedPayload> {
    let [code, script, mcq] = required_sections(scan_fences(reply)?)?;

    if code.trim().is_empty() {
        return Err(EdureelError::extraction("python block is empty"));
    }

    let narration = parse_script(&script);
    if narration.is_empty() {
        return Err(EdureelError::extraction(
            "script block contains no lines of the form 'm:ss - text'",
        ));
    }

    let questions = parse_mcqs(&mcq)?;

    Ok(ExtractedPayload {
        code,
        narration,
        questions,
    })
}

/// Best-effort recovery of the code block from a reply that failed to
/// extract, so a retry can still show the model what it wrote.
#[must_use]
pub fn salvage_code(reply: &str) -> Option<String> {
    scan_fences(reply)
        .ok()?
        .into_iter()
        .find(|b| b.tag == "python")
        .map(|b| b.body.join("\n"))
        .filter(|code| !code.trim().is_empty())
}
