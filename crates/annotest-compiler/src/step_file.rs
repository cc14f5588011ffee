/// Step-file loading
///
/// Step-definition modules are JavaScript, so the compiler never runs them.
/// It only needs their keys: top-level step texts plus the keys of the nested
/// `before` / `after` objects. `.json` manifests are read with serde_json and
/// name the script that the generated module imports; script modules are
/// scanned for the object literal they export by default.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::catalog::{StepManifest, StepModule};
use crate::error::{CompileError, Result};

/// Load every step file, in order, into one manifest
pub fn load_manifest(paths: &[impl AsRef<Path>]) -> Result<StepManifest> {
    let mut manifest = StepManifest::new();
    for path in paths {
        let module = load_step_file(path.as_ref())?;
        tracing::debug!(
            path = %module.path.display(),
            steps = module.steps.len(),
            before = module.before.len(),
            after = module.after.len(),
            "loaded step file"
        );
        manifest.add_module(module);
    }
    Ok(manifest)
}

/// Load the keys of a single step file
pub fn load_step_file(path: &Path) -> Result<StepModule> {
    if !path.exists() {
        return Err(CompileError::FileNotFound(path.to_path_buf()));
    }
    let source = std::fs::read_to_string(path)?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => module_from_json(path, &source),
        _ => module_from_script(path, &source),
    }
}

/// Manifest field naming the script module the keys describe
const MODULE_KEY: &str = "module";

/// Read a JSON manifest: `{ "module": "..", "before": {..}, "after": {..}, "<step>": .. }`
pub fn module_from_json(path: &Path, source: &str) -> Result<StepModule> {
    let value: Value = serde_json::from_str(source)
        .map_err(|e| CompileError::step_file(path, e.to_string()))?;
    let Value::Object(entries) = value else {
        return Err(CompileError::step_file(path, "expected a JSON object"));
    };

    let mut module = StepModule::new(path).import(manifest_import(path, &entries));
    for (key, value) in entries {
        if key == MODULE_KEY && value.is_string() {
            continue;
        }
        if !is_hook_key(&key) {
            module.steps.push(key);
            continue;
        }
        let Value::Object(hooks) = value else {
            return Err(CompileError::step_file(
                path,
                format!("'{}' must be an object", key),
            ));
        };
        let keys = hooks.keys().cloned();
        if key == "before" {
            module.before.extend(keys);
        } else {
            module.after.extend(keys);
        }
    }
    Ok(module)
}

/// Script described by a manifest: its `"module"` field resolved next to the
/// manifest, else the sibling with the same stem and a `.js` extension
fn manifest_import(path: &Path, entries: &Map<String, Value>) -> PathBuf {
    match entries.get(MODULE_KEY).and_then(Value::as_str) {
        Some(module) => path.parent().unwrap_or(Path::new("")).join(module),
        None => path.with_extension("js"),
    }
}

/// Scan a JavaScript/TypeScript module for its default-exported object
pub fn module_from_script(path: &Path, source: &str) -> Result<StepModule> {
    let mut scanner = Scanner::new(source);
    let tokens = scanner
        .tokens()
        .map_err(|message| CompileError::step_file(path, message))?;
    let start = find_exported_object(&tokens)
        .ok_or_else(|| CompileError::step_file(path, "no default-exported object literal found"))?;

    scanner.pos = start;
    let properties = scanner
        .object(true)
        .map_err(|message| CompileError::step_file(path, message))?;

    let mut module = StepModule::new(path);
    for Property { key, nested } in properties {
        if !is_hook_key(&key) {
            module.steps.push(key);
            continue;
        }
        let keys = nested.ok_or_else(|| {
            CompileError::step_file(path, format!("'{}' must be an object literal", key))
        })?;
        if key == "before" {
            module.before.extend(keys);
        } else {
            module.after.extend(keys);
        }
    }
    Ok(module)
}

fn is_hook_key(key: &str) -> bool {
    key == "before" || key == "after"
}

/// Position of the `{` that opens the default export.
///
/// Handles `export default {`, `module.exports = {` and an exported
/// identifier bound earlier with `const|let|var name = {`.
fn find_exported_object(tokens: &[(usize, Token)]) -> Option<usize> {
    let markers: [&[&str]; 2] = [&["export", "default"], &["module", ".", "exports", "="]];
    let value = markers
        .iter()
        .find_map(|marker| find_sequence(tokens, marker).map(|i| i + marker.len()))?;

    match tokens.get(value)? {
        (pos, Token::Punct('{')) => Some(*pos),
        (_, Token::Word(ident)) => ["const", "let", "var"].iter().find_map(|decl| {
            let binding = [*decl, ident.as_str(), "="];
            let at = find_sequence(tokens, &binding)? + binding.len();
            match tokens.get(at)? {
                (pos, Token::Punct('{')) => Some(*pos),
                _ => None,
            }
        }),
        _ => None,
    }
}

/// Index of the first run of tokens spelling out `pattern`
fn find_sequence(tokens: &[(usize, Token)], pattern: &[&str]) -> Option<usize> {
    (0..tokens.len()).find(|&i| {
        tokens
            .get(i..i + pattern.len())
            .is_some_and(|run| run.iter().zip(pattern).all(|((_, token), text)| token.is(text)))
    })
}

/// Code token outside comments; literal contents are never inspected
#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Word(String),
    Punct(char),
    Literal,
}

impl Token {
    fn is(&self, text: &str) -> bool {
        match self {
            Token::Word(word) => word == text,
            Token::Punct(c) => text.chars().eq(std::iter::once(*c)),
            Token::Literal => false,
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// One property of a scanned object literal
#[derive(Debug, Clone, PartialEq, Eq)]
struct Property {
    key: String,
    /// Keys of a nested object literal value (only collected for hooks)
    nested: Option<Vec<String>>,
}

type ScanResult<T> = std::result::Result<T, String>;

/// Character scanner over a JavaScript object literal.
///
/// Understands just enough syntax to find property keys: strings, template
/// literals, comments and balanced brackets. Values are skipped.
struct Scanner {
    chars: Vec<char>,
    pos: usize,
}

impl Scanner {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn expect(&mut self, expected: char) -> ScanResult<()> {
        match self.bump() {
            Some(c) if c == expected => Ok(()),
            Some(c) => Err(format!("expected '{}', found '{}'", expected, c)),
            None => Err(format!("expected '{}', found end of file", expected)),
        }
    }

    /// Split the whole source into tokens, each with its starting position
    fn tokens(&mut self) -> ScanResult<Vec<(usize, Token)>> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia()?;
            let start = self.pos;
            let token = match self.peek() {
                None => return Ok(tokens),
                Some('\'' | '"') => {
                    self.string()?;
                    Token::Literal
                }
                Some('`') => {
                    self.skip_template()?;
                    Token::Literal
                }
                Some(c) if is_ident_char(c) => Token::Word(self.identifier()),
                Some(c) => {
                    self.pos += 1;
                    Token::Punct(c)
                }
            };
            tokens.push((start, token));
        }
    }

    /// Skip whitespace and comments
    fn skip_trivia(&mut self) -> ScanResult<()> {
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some(c), _) if c.is_whitespace() => {
                    self.pos += 1;
                }
                (Some('/'), Some('/')) => {
                    while let Some(c) = self.bump() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                (Some('/'), Some('*')) => {
                    self.pos += 2;
                    loop {
                        match (self.bump(), self.peek()) {
                            (Some('*'), Some('/')) => {
                                self.pos += 1;
                                break;
                            }
                            (None, _) => return Err("unterminated block comment".into()),
                            _ => {}
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    /// Read a quoted string starting at the opening quote, decoding escapes
    fn string(&mut self) -> ScanResult<String> {
        let quote = self.bump().ok_or("expected a string")?;
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('\\') => self.escape(&mut out)?,
                Some('$') if quote == '`' && self.peek() == Some('{') => {
                    return Err("template literal keys with interpolation are not supported".into());
                }
                Some(c) if c == quote => return Ok(out),
                Some(c) => out.push(c),
                None => return Err("unterminated string".into()),
            }
        }
    }

    /// Decode the escape sequence after a backslash
    fn escape(&mut self, out: &mut String) -> ScanResult<()> {
        match self.bump() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('v') => out.push('\u{b}'),
            Some('0') if !self.peek().is_some_and(|c| c.is_ascii_digit()) => out.push('\0'),
            Some('x') => {
                let code = self.hex_digits(2)?;
                out.push(code_point(code)?);
            }
            Some('u') => out.push(self.unicode_escape()?),
            // line continuation
            Some('\r') => {
                if self.peek() == Some('\n') {
                    self.pos += 1;
                }
            }
            Some('\n' | '\u{2028}' | '\u{2029}') => {}
            Some(c) => out.push(c),
            None => return Err("unterminated string".into()),
        }
        Ok(())
    }

    /// `\u{X..}`, `\uXXXX`, or a `\uXXXX\uXXXX` surrogate pair
    fn unicode_escape(&mut self) -> ScanResult<char> {
        if self.peek() == Some('{') {
            self.pos += 1;
            let mut digits = String::new();
            loop {
                match self.bump() {
                    Some('}') => break,
                    Some(c) => digits.push(c),
                    None => return Err("unterminated unicode escape".into()),
                }
            }
            return code_point(parse_hex(&digits)?);
        }

        let high = self.hex_digits(4)?;
        if (0xD800..0xDC00).contains(&high)
            && self.peek() == Some('\\')
            && self.peek_at(1) == Some('u')
        {
            let resume = self.pos;
            self.pos += 2;
            match self.hex_digits(4) {
                Ok(low) if (0xDC00..0xE000).contains(&low) => {
                    return code_point(0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00));
                }
                _ => self.pos = resume,
            }
        }
        code_point(high)
    }

    fn hex_digits(&mut self, count: usize) -> ScanResult<u32> {
        let digits: String = (0..count).filter_map(|_| self.bump()).collect();
        if digits.chars().count() != count {
            return Err("unterminated escape sequence".into());
        }
        parse_hex(&digits)
    }

    /// Skip a template literal, including `${ ... }` substitutions
    fn skip_template(&mut self) -> ScanResult<()> {
        self.expect('`')?;
        loop {
            match self.bump() {
                Some('\\') => {
                    self.bump();
                }
                Some('`') => return Ok(()),
                Some('$') if self.peek() == Some('{') => self.skip_balanced()?,
                Some(_) => {}
                None => return Err("unterminated template literal".into()),
            }
        }
    }

    /// Skip a bracketed region starting at its opening bracket
    fn skip_balanced(&mut self) -> ScanResult<()> {
        let mut stack = Vec::new();
        loop {
            self.skip_trivia()?;
            match self.peek() {
                Some(open @ ('(' | '[' | '{')) => {
                    stack.push(closing(open));
                    self.pos += 1;
                }
                Some(close @ (')' | ']' | '}')) => {
                    if stack.pop() != Some(close) {
                        return Err(format!("unbalanced '{}'", close));
                    }
                    self.pos += 1;
                    if stack.is_empty() {
                        return Ok(());
                    }
                }
                Some('\'' | '"') => {
                    self.string()?;
                }
                Some('`') => self.skip_template()?,
                Some(_) => self.pos += 1,
                None => return Err("unexpected end of file".into()),
            }
        }
    }

    /// Skip a property value, stopping before the `,` or `}` that ends it
    fn skip_value(&mut self) -> ScanResult<()> {
        loop {
            self.skip_trivia()?;
            match self.peek() {
                Some(',' | '}') => return Ok(()),
                Some('(' | '[' | '{') => self.skip_balanced()?,
                Some(c @ (')' | ']')) => return Err(format!("unbalanced '{}'", c)),
                Some('\'' | '"') => {
                    self.string()?;
                }
                Some('`') => self.skip_template()?,
                Some(_) => self.pos += 1,
                None => return Err("unexpected end of file".into()),
            }
        }
    }

    fn identifier(&mut self) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek().filter(|&c| is_ident_char(c)) {
            out.push(c);
            self.pos += 1;
        }
        out
    }

    /// Read a property key, or `None` for computed keys and spreads
    fn key(&mut self) -> ScanResult<Option<String>> {
        match self.peek() {
            Some('\'' | '"' | '`') => self.string().map(Some),
            Some('[') => {
                self.skip_balanced()?;
                Ok(None)
            }
            Some('.') if self.peek_at(1) == Some('.') && self.peek_at(2) == Some('.') => {
                self.pos += 3;
                self.skip_value()?;
                Ok(None)
            }
            Some(c) if is_ident_char(c) => {
                let ident = self.identifier();
                // `async name() {}`, `get name() {}`
                if matches!(ident.as_str(), "async" | "get" | "set") {
                    self.skip_trivia()?;
                    if !matches!(self.peek(), Some(':' | '(' | ',' | '}')) {
                        return self.key();
                    }
                }
                Ok(Some(ident))
            }
            Some(c) => Err(format!("unexpected '{}' where a property key was expected", c)),
            None => Err("unexpected end of file".into()),
        }
    }

    /// Scan an object literal starting at `{`.
    ///
    /// At the top level the values of `before` / `after` are scanned as
    /// nested objects; every other value is skipped.
    fn object(&mut self, top_level: bool) -> ScanResult<Vec<Property>> {
        self.expect('{')?;
        let mut properties = Vec::new();
        loop {
            self.skip_trivia()?;
            if self.peek() == Some('}') {
                self.pos += 1;
                return Ok(properties);
            }

            let key = self.key()?;
            self.skip_trivia()?;

            let mut nested = None;
            match self.peek() {
                Some(':') => {
                    self.pos += 1;
                    self.skip_trivia()?;
                    let is_hook = key.as_deref().is_some_and(is_hook_key);
                    if top_level && is_hook && self.peek() == Some('{') {
                        let keys: Vec<String> = self.object(false)?.into_iter().map(|p| p.key).collect();
                        nested = Some(keys);
                    } else {
                        self.skip_value()?;
                    }
                }
                Some('(') => {
                    // method shorthand
                    self.skip_balanced()?;
                    self.skip_trivia()?;
                    self.skip_balanced()?;
                }
                _ => {}
            }

            if let Some(key) = key {
                properties.push(Property { key, nested });
            }

            self.skip_trivia()?;
            match self.peek() {
                Some(',') => self.pos += 1,
                Some('}') => {}
                Some(c) => return Err(format!("expected ',' or '}}', found '{}'", c)),
                None => return Err("unexpected end of file".into()),
            }
        }
    }
}

fn parse_hex(digits: &str) -> ScanResult<u32> {
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("invalid escape sequence '{}'", digits));
    }
    u32::from_str_radix(digits, 16).map_err(|_| format!("invalid escape sequence '{}'", digits))
}

fn code_point(code: u32) -> ScanResult<char> {
    char::from_u32(code).ok_or_else(|| format!("invalid code point U+{:X}", code))
}

fn closing(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEMO_STEPS: &str = r#"
export default {
  before: {
    all: () => t => {},
  },
  after: {
    justOne: () => t => {},
  },
  'When I test': () => t => {},
};
"#;

    fn scan(source: &str) -> StepModule {
        module_from_script(Path::new("steps.js"), source).unwrap()
    }

    #[test]
    fn test_scan_demo_module() {
        let module = scan(DEMO_STEPS);
        assert_eq!(module.before, vec!["all"]);
        assert_eq!(module.after, vec!["justOne"]);
        assert_eq!(module.steps, vec!["When I test"]);
    }

    #[test]
    fn test_scan_skips_values_comments_and_strings() {
        let source = r#"
// export default { ignored: 1 } is not it either
import { Selector } from 'testcafe';

export default {
  /* block } comment */
  "Given I open \"home\"": ({ url = '/' }) => async t => {
    await t.navigateTo(`${url}?q=${[1, 2].join('}')}`);
  },
  `Then I see it`: data => t => t.expect(Selector('h1').exists).ok(),
  async 'When I wait'(data) { return t => t.wait(10); },
  plain() { return () => {}; },
  [computed]: () => () => {},
  ...shared,
  shorthand,
};
"#;
        let module = scan(source);
        assert_eq!(
            module.steps,
            vec![
                "Given I open \"home\"",
                "Then I see it",
                "When I wait",
                "plain",
                "shorthand",
            ]
        );
        assert!(module.before.is_empty());
    }

    #[test]
    fn test_scan_exported_binding() {
        let source = "const steps = {\n  before: { 'log in': () => t => {} },\n};\nexport default steps;\n";
        let module = scan(source);
        assert_eq!(module.before, vec!["log in"]);
    }

    #[test]
    fn test_scan_commonjs() {
        let module = scan("module.exports = { after: { all() { return () => {}; } } };");
        assert_eq!(module.after, vec!["all"]);
    }

    #[test]
    fn test_scan_errors() {
        let path = Path::new("bad.js");
        assert!(module_from_script(path, "export const x = 1;").is_err());
        assert!(module_from_script(path, "export default { 'a': () => {").is_err());
        assert!(module_from_script(path, "export default { before: hooks };").is_err());
    }

    #[test]
    fn test_scan_ignores_exports_in_comments_and_strings() {
        let source = r#"
/*
 * Usage: export default { notAStep: 1 }
 */
const usage = "module.exports = { alsoNot: 1 }";
export default {
  'When I test': () => t => {},
};
"#;
        let module = scan(source);
        assert_eq!(module.steps, vec!["When I test"]);
    }

    #[test]
    fn test_scan_binding_name_must_match_exactly() {
        let source = r#"
const stepsCommon = { 'Given shared': () => t => {} };
const steps = { ...stepsCommon, 'When I test': () => t => {} };
export default steps;
"#;
        let module = scan(source);
        assert_eq!(module.steps, vec!["When I test"]);
    }

    #[test]
    fn test_scan_decodes_escapes_in_keys() {
        let source = r#"
export default {
  'I visit the caf\u00e9': () => t => {},
  "na\xefve \u{1F600}": () => t => {},
  'pair \uD83D\uDE00': () => t => {},
  'split \
line': () => t => {},
};
"#;
        let module = scan(source);
        assert_eq!(
            module.steps,
            vec![
                "I visit the caf\u{e9}",
                "na\u{ef}ve \u{1F600}",
                "pair \u{1F600}",
                "split line",
            ]
        );
        assert!(module_from_script(Path::new("bad.js"), r"export default { '\u{110000}': 1 };").is_err());
        assert!(module_from_script(Path::new("bad.js"), r"export default { '\xZZ': 1 };").is_err());
    }

    #[test]
    fn test_json_manifest() {
        let source = r#"{ "before": { "all": null }, "When I test": true, "after": { "a": 1, "b": 2 } }"#;
        let module = module_from_json(Path::new("e2e/steps.json"), source).unwrap();
        assert_eq!(module.before, vec!["all"]);
        assert_eq!(module.after.len(), 2);
        assert_eq!(module.steps, vec!["When I test"]);
        assert_eq!(module.path, Path::new("e2e/steps.json"));
        assert_eq!(module.import, Path::new("e2e/steps.js"));

        assert!(module_from_json(Path::new("x.json"), "[]").is_err());
        assert!(module_from_json(Path::new("x.json"), r#"{ "before": [] }"#).is_err());
    }

    #[test]
    fn test_json_manifest_names_its_script() {
        let source = r#"{ "module": "../lib/steps.mjs", "When I test": true }"#;
        let module = module_from_json(Path::new("e2e/steps/keys.json"), source).unwrap();
        assert_eq!(module.import, Path::new("e2e/steps/../lib/steps.mjs"));
        assert_eq!(module.steps, vec!["When I test"]);
    }
}
