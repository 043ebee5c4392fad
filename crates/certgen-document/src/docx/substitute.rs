// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// `{{token}}` substitution inside one WordprocessingML part.

use std::ops::Range;

use certgen_core::VariableMap;
use tracing::{debug, warn};

use super::runs::{RunIndex, text_element};
use super::{DiagnosticKind, SubstitutionDiagnostic};
use crate::format::TOKEN_RE;

#[derive(Debug)]
struct Edit {
    range: Range<usize>,
    replacement: String,
    token: String,
    placeholder: bool,
}

/// Result of substituting one part.
#[derive(Debug, Default)]
pub struct PartSubstitution {
    pub xml: String,
    pub replaced: usize,
    pub diagnostics: Vec<SubstitutionDiagnostic>,
}

/// Replace every resolvable token in `xml`.
///
/// Each `placeholders` occurrence is merged into a single run but left as
/// literal text, so a later pass can find it without re-indexing split runs.
pub fn substitute_part(
    part: &str,
    xml: &str,
    variables: &VariableMap,
    placeholders: &[&str],
) -> PartSubstitution {
    let index = RunIndex::build(xml);
    let mut diagnostics = Vec::new();
    let mut edits: Vec<Edit> = Vec::new();

    for placeholder in placeholders.iter().filter(|p| !p.is_empty()) {
        for (start, _) in index.text.match_indices(*placeholder) {
            edits.push(Edit {
                range: start..start + placeholder.len(),
                replacement: (*placeholder).to_string(),
                token: (*placeholder).to_string(),
                placeholder: true,
            });
        }
    }

    for caps in TOKEN_RE.captures_iter(&index.text) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if edits.iter().any(|e| overlaps(&e.range, &whole.range())) {
            continue;
        }
        match variables.get(name.as_str()) {
            Some(value) => edits.push(Edit {
                range: whole.range(),
                replacement: value.as_display(),
                token: name.as_str().to_string(),
                placeholder: false,
            }),
            None => {
                let (first, last) = index.span(&whole.range()).unwrap_or((0, 0));
                diagnostics.push(SubstitutionDiagnostic {
                    token: name.as_str().to_string(),
                    part: part.to_string(),
                    kind: DiagnosticKind::MissingVariable,
                    split_across_runs: last > first,
                    run_count: last.saturating_sub(first) + 1,
                });
            }
        }
    }

    // Back to front, so earlier offsets stay valid while later runs change.
    edits.sort_by(|a, b| b.range.start.cmp(&a.range.start));

    let mut texts: Vec<String> = index.runs.iter().map(|r| r.text.clone()).collect();
    let mut changed: Vec<usize> = Vec::new();
    let mut replaced = 0;
    let mut floor = usize::MAX;

    for edit in &edits {
        if edit.range.end > floor {
            continue;
        }
        let Some((first, last)) = index.span(&edit.range) else {
            continue;
        };
        let run_count = last - first + 1;
        if index.runs[first].paragraph != index.runs[last].paragraph {
            warn!(part, token = %edit.token, run_count, "token spans paragraphs, left unresolved");
            diagnostics.push(SubstitutionDiagnostic {
                token: edit.token.clone(),
                part: part.to_string(),
                kind: DiagnosticKind::UnisolatedRun,
                split_across_runs: true,
                run_count,
            });
            continue;
        }

        let local_start = edit.range.start - index.runs[first].offset;
        let local_end = edit.range.end - index.runs[last].offset;
        if first == last {
            let text = &texts[first];
            texts[first] = format!("{}{}{}", &text[..local_start], edit.replacement, &text[local_end..]);
        } else {
            texts[first] = format!("{}{}", &texts[first][..local_start], edit.replacement);
            for middle in &mut texts[first + 1..last] {
                middle.clear();
            }
            texts[last] = texts[last][local_end..].to_string();
        }
        changed.extend(first..=last);
        floor = edit.range.start;
        if !edit.placeholder {
            replaced += 1;
        }
        if run_count > 1 {
            debug!(part, token = %edit.token, run_count, "merged token split across runs");
        }
    }

    let xml = if changed.is_empty() {
        xml.to_string()
    } else {
        index.rewrite(xml, &changed, |idx| text_element(&texts[idx]))
    };

    diagnostics.sort_by(|a, b| a.token.cmp(&b.token));
    PartSubstitution {
        xml,
        replaced,
        diagnostics,
    }
}

fn overlaps(a: &Range<usize>, b: &Range<usize>) -> bool {
    a.start < b.end && b.start < a.end
}
