//! Interactive conflict decisions on the terminal

use std::io::{self, BufRead, Write};

use async_trait::async_trait;
use quire_core::{Conflict, DocumentId, ResolutionKind, ResolutionProvider, ResolvedConflict};

use crate::commands::common::{preview, short_id};

/// Asks on stdin for every manual conflict; `q` or end of input abandons the sync
pub struct PromptResolver;

#[async_trait]
impl ResolutionProvider for PromptResolver {
    async fn resolve(
        &self,
        document_id: DocumentId,
        conflicts: &[Conflict],
    ) -> Option<Vec<ResolvedConflict>> {
        let conflicts = conflicts.to_vec();
        let answered = tokio::task::spawn_blocking(move || {
            let stdin = io::stdin();
            let mut input = stdin.lock();
            let mut output = io::stdout();
            prompt_decisions(document_id, &conflicts, &mut input, &mut output)
        })
        .await;

        match answered {
            Ok(Ok(decisions)) => decisions,
            Ok(Err(error)) => {
                tracing::warn!(%error, "Conflict prompt failed");
                None
            }
            Err(error) => {
                tracing::warn!(%error, "Conflict prompt task failed");
                None
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Pick(ResolutionKind),
    Quit,
}

pub fn parse_choice(answer: &str) -> Option<Choice> {
    match answer.trim().to_ascii_lowercase().as_str() {
        "l" | "local" => Some(Choice::Pick(ResolutionKind::LocalWins)),
        "r" | "remote" => Some(Choice::Pick(ResolutionKind::RemoteWins)),
        "m" | "merge" => Some(Choice::Pick(ResolutionKind::Merged)),
        "q" | "quit" => Some(Choice::Quit),
        _ => None,
    }
}

/// Walk through `conflicts` in order. `None` means the person gave up.
pub fn prompt_decisions(
    document_id: DocumentId,
    conflicts: &[Conflict],
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> io::Result<Option<Vec<ResolvedConflict>>> {
    writeln!(
        output,
        "{} needs {} decision(s)",
        short_id(&document_id),
        conflicts.len()
    )?;

    let mut decisions = Vec::with_capacity(conflicts.len());
    for conflict in conflicts {
        for line in format_conflict_lines(conflict) {
            writeln!(output, "{line}")?;
        }
        match ask(conflict, input, output)? {
            Some(decision) => decisions.push(decision),
            None => return Ok(None),
        }
    }
    Ok(Some(decisions))
}

fn ask(
    conflict: &Conflict,
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> io::Result<Option<ResolvedConflict>> {
    let choices = if conflict.field.is_mergeable() {
        "l/r/m/q"
    } else {
        "l/r/q"
    };

    loop {
        write!(output, "Keep which value? [{choices}] ")?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(None);
        }

        match parse_choice(&line) {
            Some(Choice::Quit) => return Ok(None),
            Some(Choice::Pick(kind)) => match conflict.resolve(kind) {
                Some(decision) => return Ok(Some(decision)),
                None => writeln!(output, "{} cannot be merged", conflict.field)?,
            },
            None => writeln!(output, "Please answer one of {choices}")?,
        }
    }
}

pub fn format_conflict_lines(conflict: &Conflict) -> Vec<String> {
    vec![
        format!("{} changed on both sides", conflict.field),
        format!(
            "  l) local:  {}  [@{}]",
            preview(&conflict.local_value.to_string(), 60),
            conflict.local_timestamp
        ),
        format!(
            "  r) remote: {}  [@{}]",
            preview(&conflict.remote_value.to_string(), 60),
            conflict.remote_timestamp
        ),
    ]
}
