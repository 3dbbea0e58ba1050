/// The tool-call tag pairs whose enclosed lines must come through
/// byte-identical. Versioned here as static configuration, not editable at
/// runtime.
pub const VERBATIM_MARKERS: &[(&str, &str)] = &[
    ("<write_to_file>", "</write_to_file>"),
    ("<content>", "</content>"),
    ("<thinking>", "</thinking>"),
    ("<execute_command>", "</execute_command>"),
    ("<command>", "</command>"),
    ("<ask_followup_question>", "</ask_followup_question>"),
    ("<question>", "</question>"),
    ("<attempt_completion>", "</attempt_completion>"),
    ("<result>", "</result>"),
    ("<list_code_definition_names>", "</list_code_definition_names>"),
    ("<path>", "</path>"),
    ("<search_files>", "</search_files>"),
    ("<regex>", "</regex>"),
    ("<file_pattern>", "</file_pattern>"),
];

/// UI chrome the copy affordance captures alongside the real content.
pub const BOILERPLATE: &[&str] = &[
    " content_copy  download  Use code [with caution](https://support.google.com/legal/answer/13505487).Markdown",
    " content_copy  download  Use code [with caution](https://support.google.com/legal/answer/13505487).Xml",
    " content_copy  download  Use code [with caution](https://support.google.com/legal/answer/13505487).",
    "content_copy  Use code with caution.Xml",
    "content_copy  Use code with caution. warning",
    "content_copy  download  Use code with caution.Xml",
    "content_copy  Use code with caution.",
];

/// The literal two-character escape upstream systems leave in place of real
/// line breaks outside verbatim spans.
const ESCAPED_NEWLINE: &str = "\\n";

/// Reformats raw extracted text: boilerplate stripped, escaped newlines
/// expanded in plain text, verbatim spans preserved exactly.
pub struct ResponseSanitizer {
    markers: &'static [(&'static str, &'static str)],
    boilerplate: &'static [&'static str],
}

impl Default for ResponseSanitizer {
    fn default() -> Self {
        Self {
            markers: VERBATIM_MARKERS,
            boilerplate: BOILERPLATE,
        }
    }
}

impl ResponseSanitizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Substitute vocabulary, for callers targeting a different surface.
    pub fn with_vocabulary(
        markers: &'static [(&'static str, &'static str)],
        boilerplate: &'static [&'static str],
    ) -> Self {
        Self {
            markers,
            boilerplate,
        }
    }

    /// Process `raw` line by line.
    ///
    /// A line carrying a start marker flips into verbatim mode, the line
    /// carrying the matching end marker flips back out; both marker lines
    /// and everything between them are emitted unchanged. Outside verbatim
    /// spans every literal `\n` escape is expanded to a real line break.
    /// Unbalanced markers are a data-quality condition, not an error: the
    /// flag simply keeps whatever state the input left it in.
    pub fn sanitize(&self, raw: &str) -> String {
        let mut out = String::with_capacity(raw.len());
        // Some(end) while inside a verbatim span, holding the marker that
        // closes it.
        let mut inside: Option<&'static str> = None;

        for line in raw.lines() {
            let mut line = line.to_string();
            for chrome in self.boilerplate {
                if line.contains(chrome) {
                    line = line.replace(chrome, "");
                }
            }

            match inside {
                Some(end) => {
                    if line.contains(end) {
                        inside = None;
                    }
                    out.push_str(&line);
                }
                None => {
                    if let Some(end) = self.opens_span(&line) {
                        inside = end;
                        out.push_str(&line);
                    } else {
                        out.push_str(&line.replace(ESCAPED_NEWLINE, "\n"));
                    }
                }
            }
            out.push('\n');
        }
        out
    }

    /// `None` if the line carries no start marker. `Some(Some(end))` if it
    /// opens a span that `end` will close; `Some(None)` if the span opens
    /// and closes on this same line, which leaves the state unchanged but
    /// still exempts the line from expansion.
    fn opens_span(&self, line: &str) -> Option<Option<&'static str>> {
        for (start, end) in self.markers {
            if let Some(at) = line.find(start) {
                // A pair opened and closed on one line leaves us outside.
                if line[at + start.len()..].contains(end) {
                    return Some(None);
                }
                return Some(Some(end));
            }
        }
        None
    }
}
