//! Comment stripping that carries block state across lines

/// C preprocessor directives that are not `#` comments
const DIRECTIVES: &[&str] = &[
    "include", "define", "undef", "if", "ifdef", "ifndef", "elif", "else", "endif", "pragma",
    "error", "import",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    /// Inside `/* ... */`
    Star,
    /// Inside a docstring closed by this delimiter
    Doc(&'static str),
}

/// Scanner state threaded through the lines of one version
#[derive(Debug, Clone, Default)]
pub struct CommentState {
    block: Option<Block>,
}

fn starts_with_at(chars: &[char], at: usize, pat: &str) -> bool {
    let mut i = at;
    for p in pat.chars() {
        if chars.get(i) != Some(&p) {
            return false;
        }
        i += 1;
    }
    true
}

fn find_from(chars: &[char], from: usize, pat: &str) -> Option<usize> {
    (from..chars.len()).find(|&i| starts_with_at(chars, i, pat))
}

/// `#[..]`, `#![..]` and preprocessor lines are code, not comments
fn hash_is_code(chars: &[char], at: usize, line_start: bool) -> bool {
    match chars.get(at + 1) {
        Some('[') | Some('!') => true,
        _ if line_start => {
            let word: String = chars[at + 1..]
                .iter()
                .skip_while(|c| **c == ' ')
                .take_while(|c| c.is_ascii_alphabetic())
                .collect();
            DIRECTIVES.contains(&word.as_str())
        }
        _ => false,
    }
}

impl CommentState {
    /// Remove comments from `line`, updating the block state
    pub fn strip(&mut self, line: &str) -> String {
        let chars: Vec<char> = line.chars().collect();
        let mut out = String::with_capacity(line.len());
        let mut quote: Option<char> = None;
        let mut i = 0;

        while i < chars.len() {
            if let Some(block) = self.block {
                let close = match block {
                    Block::Star => "*/",
                    Block::Doc(delim) => delim,
                };
                match find_from(&chars, i, close) {
                    Some(end) => {
                        i = end + close.chars().count();
                        self.block = None;
                        continue;
                    }
                    None => break,
                }
            }

            let c = chars[i];

            if let Some(q) = quote {
                out.push(c);
                if c == '\\' {
                    if let Some(&next) = chars.get(i + 1) {
                        out.push(next);
                        i += 1;
                    }
                } else if c == q {
                    quote = None;
                }
                i += 1;
                continue;
            }

            let line_start = out.trim().is_empty();

            if starts_with_at(&chars, i, "//") {
                break;
            }
            if c == '#' && !hash_is_code(&chars, i, line_start) {
                break;
            }
            if starts_with_at(&chars, i, "/*") {
                self.block = Some(Block::Star);
                i += 2;
                continue;
            }
            if line_start {
                if starts_with_at(&chars, i, "\"\"\"") {
                    self.block = Some(Block::Doc("\"\"\""));
                    i += 3;
                    continue;
                }
                if starts_with_at(&chars, i, "'''") {
                    self.block = Some(Block::Doc("'''"));
                    i += 3;
                    continue;
                }
            }
            if c == '"' || c == '\'' {
                quote = Some(c);
            }
            out.push(c);
            i += 1;
        }

        out
    }
}
