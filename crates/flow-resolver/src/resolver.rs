//! Rewrite string-location imports into address imports.
//!
//! Import paths are relative to the importing file. Both sides are cleaned
//! lexically (no filesystem access), so `./contracts/../Foo.cdc` and `Foo.cdc`
//! name the same contract.

use std::collections::HashMap;
use std::path::Path;

use flow_types::{Address, Error, Result, Value};
use tracing::debug;

use crate::parser::{Import, Location, Program};

/// A contract as configured for one network: where its source lives and which
/// account it deploys to.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedContract {
    pub name: String,
    pub source: String,
    pub target: Address,
    /// Initializer arguments from the deployment entry.
    pub args: Vec<Value>,
}

impl ResolvedContract {
    pub fn new(name: impl Into<String>, source: impl Into<String>, target: Address) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            target,
            args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }
}

// =============================================================================
// Paths
// =============================================================================

/// Lexically clean a slash-separated path.
///
/// # Examples
///
/// ```
/// use flow_resolver::resolver::clean_path;
///
/// assert_eq!(clean_path("./contracts/../Foo.cdc"), "Foo.cdc");
/// assert_eq!(clean_path("/a//b/./c"), "/a/b/c");
/// assert_eq!(clean_path("../x.cdc"), "../x.cdc");
/// ```
pub fn clean_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    let rooted = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();

    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|last| *last != "..") {
                    parts.pop();
                } else if !rooted {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    match (rooted, joined.is_empty()) {
        (true, _) => format!("/{}", joined),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

/// Path of `import_location` as seen from the file at `importing_file`.
pub fn import_path(importing_file: &str, import_location: &str) -> String {
    if import_location.starts_with('/') {
        return clean_path(import_location);
    }
    let dir = Path::new(importing_file)
        .parent()
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .unwrap_or_default();
    if dir.is_empty() {
        clean_path(import_location)
    } else {
        clean_path(&format!("{}/{}", dir, import_location))
    }
}

/// `"./Foo.cdc"` is a path; `"Foo"` is a contract name.
pub fn is_path_location(location: &str) -> bool {
    location.contains('/') || location.ends_with(".cdc")
}

fn file_stem(path: &str) -> Option<&str> {
    Path::new(path).file_stem().and_then(|s| s.to_str())
}

// =============================================================================
// Address map
// =============================================================================

/// Lookup table from cleaned source paths and contract names to addresses.
#[derive(Debug, Clone, Default)]
pub struct AddressMap {
    by_path: HashMap<String, Address>,
    by_name: HashMap<String, Address>,
}

impl AddressMap {
    /// Aliases are keyed by source path; the file stem doubles as the name.
    pub fn new(contracts: &[ResolvedContract], aliases: &HashMap<String, Address>) -> Self {
        let mut map = Self::default();
        for (path, address) in aliases {
            map.by_path.insert(clean_path(path), *address);
            if let Some(stem) = file_stem(path) {
                map.by_name.entry(stem.to_string()).or_insert(*address);
            }
        }
        // deployment targets win over aliases for the same key
        for contract in contracts {
            map.by_path.insert(clean_path(&contract.source), contract.target);
            map.by_name.insert(contract.name.clone(), contract.target);
        }
        map
    }

    pub fn lookup_path(&self, path: &str) -> Option<Address> {
        self.by_path.get(&clean_path(path)).copied()
    }

    pub fn lookup_name(&self, name: &str) -> Option<Address> {
        self.by_name.get(name).copied()
    }

    /// Address an import of the file at `importing_file` refers to.
    pub fn lookup(&self, importing_file: &str, import: &Import) -> Result<Address> {
        match &import.location {
            Location::Address(address) => Ok(*address),
            Location::String(location) if is_path_location(location) => {
                let path = import_path(importing_file, location);
                self.lookup_path(&path)
                    .ok_or_else(|| Error::UnresolvedImport(location.clone()))
            }
            Location::String(name) | Location::Identifier(name) => self
                .lookup_name(name)
                .ok_or_else(|| Error::UnresolvedImport(name.clone())),
        }
    }
}

// =============================================================================
// Resolver
// =============================================================================

/// A parsed program together with the file it was read from.
#[derive(Debug, Clone)]
pub struct Resolver {
    location: String,
    program: Program,
}

impl Resolver {
    pub fn new(code: &[u8], location: &str) -> Result<Self> {
        Ok(Self {
            location: location.to_string(),
            program: Program::parse(code)?,
        })
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    /// True when some import still points at a file or a name.
    pub fn has_imports(&self) -> bool {
        self.program.has_imports()
    }

    /// Rewrite imports using deployment targets plus aliases.
    pub fn resolve(
        &self,
        contracts: &[ResolvedContract],
        aliases: &HashMap<String, Address>,
    ) -> Result<String> {
        self.resolve_with(&AddressMap::new(contracts, aliases))
    }

    pub fn resolve_with(&self, map: &AddressMap) -> Result<String> {
        let source = self.program.source();
        let mut code = String::with_capacity(source.len());
        let mut cursor = 0;

        for import in self.program.unresolved_imports() {
            let address = map.lookup(&self.location, import)?;
            let replacement = match (&import.location, import.identifiers.is_empty()) {
                (Location::String(_), false) => address.hex_with_prefix(),
                (Location::String(location), true) => {
                    let name = file_stem(location).unwrap_or(location.as_str());
                    format!("{} from {}", name, address.hex_with_prefix())
                }
                (Location::Identifier(name), _) => {
                    format!("{} from {}", name, address.hex_with_prefix())
                }
                (Location::Address(_), _) => continue,
            };
            debug!(file = %self.location, import = %&source[import.span.clone()], %address, "resolved import");

            code.push_str(&source[cursor..import.span.start]);
            code.push_str(&replacement);
            cursor = import.span.end;
        }
        code.push_str(&source[cursor..]);

        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(hex: &str) -> Address {
        Address::from_hex(hex).unwrap()
    }

    #[test]
    fn test_clean_path() {
        assert_eq!(clean_path("./Foo.cdc"), "Foo.cdc");
        assert_eq!(clean_path("contracts/./nested/../Foo.cdc"), "contracts/Foo.cdc");
        assert_eq!(clean_path("../../a"), "../../a");
        assert_eq!(clean_path("/../a"), "/a");
        assert_eq!(clean_path(""), ".");
        assert_eq!(clean_path("a\\b.cdc"), "a/b.cdc");
    }

    #[test]
    fn test_import_path_is_relative_to_importer() {
        assert_eq!(
            import_path("./contracts/Foo.cdc", "./NonFungibleToken.cdc"),
            "contracts/NonFungibleToken.cdc"
        );
        assert_eq!(
            import_path("contracts/nft/Foo.cdc", "../core/Token.cdc"),
            "contracts/core/Token.cdc"
        );
        assert_eq!(import_path("Foo.cdc", "./Bar.cdc"), "Bar.cdc");
        assert_eq!(import_path("scripts/get.cdc", "/abs/Bar.cdc"), "/abs/Bar.cdc");
    }

    #[test]
    fn test_resolve_path_imports() {
        let code = b"import NonFungibleToken from \"./NonFungibleToken.cdc\"\nimport FungibleToken from \"../std/FungibleToken.cdc\"\naccess(all) contract Foo {}";
        let resolver = Resolver::new(code, "./contracts/Foo.cdc").unwrap();
        assert!(resolver.has_imports());

        let contracts = vec![ResolvedContract::new(
            "NonFungibleToken",
            "contracts/NonFungibleToken.cdc",
            addr("f8d6e0586b0a20c7"),
        )];
        let mut aliases = HashMap::new();
        aliases.insert("./std/FungibleToken.cdc".to_string(), addr("ee82856bf20e2aa6"));

        let resolved = resolver.resolve(&contracts, &aliases).unwrap();
        assert!(resolved.contains("import NonFungibleToken from 0xf8d6e0586b0a20c7"));
        assert!(resolved.contains("import FungibleToken from 0xee82856bf20e2aa6"));
        assert!(!resolved.contains(".cdc\""));
        assert!(resolved.ends_with("access(all) contract Foo {}"));
    }

    #[test]
    fn test_resolve_name_imports() {
        let code = b"import \"Foo\"\nimport Bar\naccess(all) fun main() {}";
        let resolver = Resolver::new(code, "script.cdc").unwrap();
        let contracts = vec![ResolvedContract::new("Foo", "Foo.cdc", addr("01cf0e2f2f715450"))];
        let mut aliases = HashMap::new();
        aliases.insert("./Bar.cdc".to_string(), addr("0ae53cb6e3f42a79"));

        let resolved = resolver.resolve(&contracts, &aliases).unwrap();
        assert!(resolved.starts_with("import Foo from 0x01cf0e2f2f715450\nimport Bar from 0x0ae53cb6e3f42a79\n"));
    }

    #[test]
    fn test_unresolved_import_names_the_path() {
        let resolver = Resolver::new(b"import Missing from \"./Missing.cdc\"", "Foo.cdc").unwrap();
        let err = resolver.resolve(&[], &HashMap::new()).unwrap_err();
        assert_eq!(err, Error::UnresolvedImport("./Missing.cdc".into()));
    }

    #[test]
    fn test_address_imports_untouched() {
        let code = "import Foo from 0x01\naccess(all) fun main() {}";
        let resolver = Resolver::new(code.as_bytes(), "main.cdc").unwrap();
        assert!(!resolver.has_imports());
        assert_eq!(resolver.resolve(&[], &HashMap::new()).unwrap(), code);
    }
}
