//! Import declaration scanner for contract source.
//!
//! Only the import declarations of a program matter to deployment, so this is
//! a scanner rather than a full parser: it walks the source skipping
//! whitespace, comments and string literals, and parses every
//! `import ... from <location>` it meets at the token level.
//!
//! Supported forms:
//!
//! ```text
//! import FungibleToken from 0xf233dcee88fe0abe
//! import NonFungibleToken, MetadataViews from "./NonFungibleToken.cdc"
//! import "FungibleToken"
//! import Crypto
//! ```

use std::ops::Range;

use flow_types::{Address, Error, Result};

/// Where an import points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// `"./Foo.cdc"` or `"Foo"`.
    String(String),
    /// `0x01`.
    Address(Address),
    /// Bare identifier, `import Crypto`.
    Identifier(String),
}

/// One import declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    /// Imported names; empty for `import "Foo"` and `import Foo`.
    pub identifiers: Vec<String>,
    pub location: Location,
    /// Byte range of the location token within the source.
    pub span: Range<usize>,
}

impl Import {
    /// Whether the location must be rewritten before the code can be sent.
    pub fn needs_resolution(&self) -> bool {
        !matches!(self.location, Location::Address(_))
    }
}

/// Parsed view of a contract, script or transaction.
#[derive(Debug, Clone)]
pub struct Program {
    source: String,
    imports: Vec<Import>,
    prepare_parameters: Option<usize>,
}

impl Program {
    /// Scan `code` for import declarations.
    ///
    /// # Examples
    ///
    /// ```
    /// use flow_resolver::parser::{Location, Program};
    ///
    /// let program = Program::parse(b"import Foo from \"./Foo.cdc\"\naccess(all) contract Bar {}").unwrap();
    /// assert_eq!(program.imports().len(), 1);
    /// assert_eq!(program.imports()[0].location, Location::String("./Foo.cdc".into()));
    /// ```
    pub fn parse(code: &[u8]) -> Result<Self> {
        let source = std::str::from_utf8(code)
            .map_err(|e| Error::parse("program source", e))?
            .to_string();
        let (imports, prepare_parameters) = Scanner::new(&source).scan()?;
        Ok(Self {
            source,
            imports,
            prepare_parameters,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn imports(&self) -> &[Import] {
        &self.imports
    }

    /// Imports whose location is not already an address.
    pub fn unresolved_imports(&self) -> impl Iterator<Item = &Import> {
        self.imports.iter().filter(|import| import.needs_resolution())
    }

    pub fn has_imports(&self) -> bool {
        self.unresolved_imports().next().is_some()
    }

    /// Parameter count of the first `prepare` block, `None` without one.
    ///
    /// ```
    /// use flow_resolver::parser::Program;
    ///
    /// let tx = Program::parse(b"transaction { prepare(a: auth(Storage) &Account, b: &Account) {} }").unwrap();
    /// assert_eq!(tx.prepare_parameters(), Some(2));
    /// ```
    pub fn prepare_parameters(&self) -> Option<usize> {
        self.prepare_parameters
    }
}

// =============================================================================
// Scanner
// =============================================================================

struct Scanner<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn error(&self, message: &str) -> Error {
        let line = self.src[..self.pos.min(self.src.len())].matches('\n').count() + 1;
        Error::parse("program source", format!("{} (line {})", message, line))
    }

    fn scan(mut self) -> Result<(Vec<Import>, Option<usize>)> {
        let mut imports = Vec::new();
        let mut prepare = None;
        // Only identifiers that start a token count; `self.import` is a member access.
        let mut after_dot = false;

        loop {
            self.skip_trivia()?;
            let Some(b) = self.peek() else { break };

            if b == b'"' {
                self.string()?;
                after_dot = false;
            } else if is_ident_start(b) {
                let ident = self.ident();
                if ident == "import" && !after_dot {
                    imports.push(self.import()?);
                } else if ident == "prepare" && !after_dot && prepare.is_none() {
                    self.skip_trivia()?;
                    if self.peek() == Some(b'(') {
                        prepare = Some(self.parameters()?);
                    }
                }
                after_dot = false;
            } else {
                after_dot = b == b'.';
                self.pos += 1;
            }
        }

        Ok((imports, prepare))
    }

    /// Count the top-level parameters of a list; positioned on its `(`.
    fn parameters(&mut self) -> Result<usize> {
        let start = self.pos;
        self.pos += 1;
        let mut depth = 1usize;
        let mut count = 0;
        let mut pending = false;

        loop {
            self.skip_trivia()?;
            let Some(b) = self.peek() else {
                self.pos = start;
                return Err(self.error("unterminated parameter list"));
            };
            match b {
                b'"' => {
                    self.string()?;
                    pending = true;
                    continue;
                }
                b'(' | b'[' | b'{' | b'<' => depth += 1,
                b')' | b']' | b'}' | b'>' => {
                    depth -= 1;
                    if depth == 0 {
                        self.pos += 1;
                        return Ok(count + usize::from(pending));
                    }
                }
                b',' if depth == 1 => {
                    count += usize::from(pending);
                    pending = false;
                    self.pos += 1;
                    continue;
                }
                _ => {}
            }
            pending = true;
            self.pos += 1;
        }
    }

    fn skip_trivia(&mut self) -> Result<()> {
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some(b), _) if b.is_ascii_whitespace() => self.pos += 1,
                (Some(b'/'), Some(b'/')) => {
                    while let Some(b) = self.peek() {
                        if b == b'\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                (Some(b'/'), Some(b'*')) => self.block_comment()?,
                _ => return Ok(()),
            }
        }
    }

    // Block comments nest.
    fn block_comment(&mut self) -> Result<()> {
        let start = self.pos;
        let mut depth = 0usize;
        while self.pos < self.bytes.len() {
            match (self.peek(), self.peek_at(1)) {
                (Some(b'/'), Some(b'*')) => {
                    depth += 1;
                    self.pos += 2;
                }
                (Some(b'*'), Some(b'/')) => {
                    depth -= 1;
                    self.pos += 2;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                _ => self.pos += 1,
            }
        }
        self.pos = start;
        Err(self.error("unterminated block comment"))
    }

    fn ident(&mut self) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_continue) {
            self.pos += 1;
        }
        &self.src[start..self.pos]
    }

    /// Consume a string literal, returning its contents and full span.
    fn string(&mut self) -> Result<(String, Range<usize>)> {
        let start = self.pos;
        self.pos += 1;
        while let Some(b) = self.peek() {
            match b {
                b'\\' => self.pos += 2,
                b'"' => {
                    self.pos += 1;
                    let contents = self.src[start + 1..self.pos - 1].to_string();
                    return Ok((contents, start..self.pos));
                }
                b'\n' => break,
                _ => self.pos += 1,
            }
        }
        self.pos = start;
        Err(self.error("unterminated string literal"))
    }

    fn address(&mut self) -> Result<(Address, Range<usize>)> {
        let start = self.pos;
        self.pos += 2;
        while self.peek().is_some_and(|b| b.is_ascii_hexdigit() || b == b'_') {
            self.pos += 1;
        }
        let literal = self.src[start..self.pos].replace('_', "");
        let address = Address::from_hex(&literal).map_err(|_| {
            self.error(&format!("invalid address location {}", literal))
        })?;
        Ok((address, start..self.pos))
    }

    fn at_address(&self) -> bool {
        self.peek() == Some(b'0') && matches!(self.peek_at(1), Some(b'x') | Some(b'X'))
    }

    /// Parse the rest of an import declaration; the keyword is consumed.
    fn import(&mut self) -> Result<Import> {
        self.skip_trivia()?;

        if self.peek() == Some(b'"') {
            let (path, span) = self.string()?;
            return Ok(Import {
                identifiers: Vec::new(),
                location: Location::String(path),
                span,
            });
        }
        if self.at_address() {
            let (address, span) = self.address()?;
            return Ok(Import {
                identifiers: Vec::new(),
                location: Location::Address(address),
                span,
            });
        }
        if !self.peek().is_some_and(is_ident_start) {
            return Err(self.error("expected import location or identifier"));
        }

        let mut identifiers = Vec::new();
        loop {
            let start = self.pos;
            let ident = self.ident();
            identifiers.push((ident.to_string(), start..self.pos));
            self.skip_trivia()?;
            if self.peek() == Some(b',') {
                self.pos += 1;
                self.skip_trivia()?;
                if !self.peek().is_some_and(is_ident_start) {
                    return Err(self.error("expected identifier after ','"));
                }
                continue;
            }
            break;
        }

        let checkpoint = self.pos;
        let keyword = if self.peek().is_some_and(is_ident_start) {
            self.ident()
        } else {
            ""
        };

        if keyword != "from" {
            self.pos = checkpoint;
            if identifiers.len() == 1 {
                let (name, span) = identifiers.remove(0);
                return Ok(Import {
                    identifiers: Vec::new(),
                    location: Location::Identifier(name),
                    span,
                });
            }
            return Err(self.error("expected 'from' after imported identifiers"));
        }

        self.skip_trivia()?;
        let identifiers = identifiers.into_iter().map(|(name, _)| name).collect();
        if self.peek() == Some(b'"') {
            let (path, span) = self.string()?;
            Ok(Import {
                identifiers,
                location: Location::String(path),
                span,
            })
        } else if self.at_address() {
            let (address, span) = self.address()?;
            Ok(Import {
                identifiers,
                location: Location::Address(address),
                span,
            })
        } else {
            Err(self.error("expected string or address location after 'from'"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(code: &str) -> Program {
        Program::parse(code.as_bytes()).unwrap()
    }

    #[test]
    fn test_import_forms() {
        let program = parse(
            r#"
import FungibleToken from 0xf233dcee88fe0abe
import NonFungibleToken, MetadataViews from "./NonFungibleToken.cdc"
import "Burner"
import Crypto

access(all) contract Foo {}
"#,
        );
        let imports = program.imports();
        assert_eq!(imports.len(), 4);

        assert_eq!(imports[0].identifiers, vec!["FungibleToken"]);
        assert_eq!(
            imports[0].location,
            Location::Address(Address::from_hex("f233dcee88fe0abe").unwrap())
        );
        assert!(!imports[0].needs_resolution());

        assert_eq!(imports[1].identifiers, vec!["NonFungibleToken", "MetadataViews"]);
        assert_eq!(imports[1].location, Location::String("./NonFungibleToken.cdc".into()));
        assert_eq!(&program.source()[imports[1].span.clone()], "\"./NonFungibleToken.cdc\"");

        assert!(imports[2].identifiers.is_empty());
        assert_eq!(imports[2].location, Location::String("Burner".into()));

        assert_eq!(imports[3].location, Location::Identifier("Crypto".into()));
        assert_eq!(&program.source()[imports[3].span.clone()], "Crypto");

        assert!(program.has_imports());
        assert_eq!(program.unresolved_imports().count(), 3);
    }

    #[test]
    fn test_ignores_comments_and_strings() {
        let program = parse(
            r#"
// import Fake from "./Fake.cdc"
/* import Other from "./Other.cdc" /* nested */ still comment */
access(all) contract Foo {
    access(all) let note: String
    init() {
        self.note = "import Bar from \"./Bar.cdc\""
    }
}
"#,
        );
        assert!(program.imports().is_empty());
        assert!(!program.has_imports());
    }

    #[test]
    fn test_prepare_parameters() {
        assert_eq!(parse("transaction { execute {} }").prepare_parameters(), None);
        assert_eq!(parse("transaction { prepare() {} }").prepare_parameters(), Some(0));
        assert_eq!(
            parse("transaction { prepare(signer: auth(Storage, Capabilities) &Account) {} }").prepare_parameters(),
            Some(1)
        );

        let program = parse(
            r#"
// prepare(a: &Account, b: &Account, c: &Account)
transaction(note: String) {
    let label: String
    prepare(
        payer: auth(BorrowValue) &Account, /* second: &Account */
        other: &Account,
    ) {
        self.label = "prepare(x: Int)"
    }
}
"#,
        );
        assert_eq!(program.prepare_parameters(), Some(2));
    }

    #[test]
    fn test_address_only_is_not_unresolved() {
        let program = parse("import Foo from 0x01\naccess(all) fun main() {}");
        assert_eq!(program.imports().len(), 1);
        assert!(!program.has_imports());
        assert_eq!(
            program.imports()[0].location,
            Location::Address(Address::from_u64(1))
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            Program::parse(b"import Foo from"),
            Err(Error::Parse { .. })
        ));
        assert!(matches!(
            Program::parse(b"import Foo, from \"./Foo.cdc\""),
            Err(Error::Parse { .. })
        ));
        assert!(matches!(
            Program::parse(b"let x = \"unterminated\n"),
            Err(Error::Parse { .. })
        ));
        assert!(matches!(
            Program::parse(b"/* never closed"),
            Err(Error::Parse { .. })
        ));
    }
}
