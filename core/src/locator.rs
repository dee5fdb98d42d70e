use lazy_static::lazy_static;
use regex::Regex;
use std::ops::Range;

lazy_static! {
    // Scheme and host are case-insensitive. The slug run stops at whitespace and at
    // delimiters that close a link in prose or markup.
    static ref SOURCE_LINK: Regex = Regex::new(
        r#"(?i)https?://(?P<host>(?:cs\.|www\.)?paperswithcode\.com)/paper/(?P<tail>[^\s)\]><"';{}|`]+)"#
    )
    .expect("valid regex");
    static ref EMBEDDED_SCHEME: Regex = Regex::new(r"(?i)https?://").expect("valid regex");
}

/// Characters that prose and markup leave glued to the end of a link.
const TRAILING_NOISE: &[char] = &['.', ',', ';', ':', '!', '*', '\'', '"', '\u{201D}', '\u{2019}', '\u{BB}'];

/// Which of the equivalent Papers with Code hostnames a link used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceHost {
    Main,
    ComputerScience,
    Www,
}

impl SourceHost {
    fn from_host(host: &str) -> Self {
        let host = host.to_ascii_lowercase();
        if host.starts_with("cs.") {
            SourceHost::ComputerScience
        } else if host.starts_with("www.") {
            SourceHost::Www
        } else {
            SourceHost::Main
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceHost::Main => "paperswithcode.com",
            SourceHost::ComputerScience => "cs.paperswithcode.com",
            SourceHost::Www => "www.paperswithcode.com",
        }
    }
}

/// A source link located in a text buffer. Offsets are byte offsets into that buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match<'t> {
    pub start: usize,
    pub end: usize,
    /// The link text covered by `start..end`, query and fragment included.
    pub url: &'t str,
    /// Paper slug with query, fragment and trailing punctuation removed. Not normalized.
    pub slug: &'t str,
    pub host: SourceHost,
}

impl<'t> Match<'t> {
    pub fn span(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Lazy left-to-right scan over a text buffer. Cloning the iterator restarts from the
/// clone's position, so a fresh `find_all` always replays the same sequence.
#[derive(Debug, Clone)]
pub struct Matches<'t> {
    text: &'t str,
    pos: usize,
}

impl<'t> Iterator for Matches<'t> {
    type Item = Match<'t>;

    fn next(&mut self) -> Option<Match<'t>> {
        while self.pos < self.text.len() {
            let caps = SOURCE_LINK.captures_at(self.text, self.pos)?;
            let (Some(whole), Some(host), Some(tail)) = (caps.get(0), caps.name("host"), caps.name("tail")) else {
                return None;
            };

            // A second link glued onto the path starts a new candidate. Query and fragment
            // belong to this link whatever they contain.
            let tail_path_len = tail.as_str().find(['?', '#']).unwrap_or(tail.len());
            let link_len = EMBEDDED_SCHEME
                .find(&tail.as_str()[..tail_path_len])
                .map(|m| m.start())
                .unwrap_or(tail.len());
            let link = &tail.as_str()[..link_len];

            let path_len = link.find(['?', '#']).unwrap_or(link.len());
            let slug = strip_trailing_noise(&link[..path_len]);
            if slug.is_empty() {
                self.pos = tail.start() + link_len;
                continue;
            }

            let end = tail.start() + strip_trailing_noise(link).len();
            self.pos = end;
            return Some(Match {
                start: whole.start(),
                end,
                url: &self.text[whole.start()..end],
                slug,
                host: SourceHost::from_host(host.as_str()),
            });
        }
        None
    }
}

fn strip_trailing_noise(s: &str) -> &str {
    s.trim_end_matches(TRAILING_NOISE)
}

/// Locate every Papers with Code paper link in `text`, in document order, without overlap.
pub fn find_all(text: &str) -> Matches<'_> {
    Matches { text, pos: 0 }
}

/// Parse a string that consists of exactly one source link, e.g. a dataset `paper_url`.
pub fn parse_source_url(url: &str) -> Option<Match<'_>> {
    let url = url.trim();
    let m = find_all(url).next()?;
    (m.start == 0 && m.end == url.len()).then_some(m)
}
