//! A dotted-name-to-grammar-resource loader stub (SPEC_FULL §10.4 / spec §6:
//! "the core itself does not perform I/O"). Lives outside `src/` so the core
//! never gains a filesystem dependency; demo callers (`demos/cli.rs`) use this
//! the way `bootpeg`'s `import_parser(__name__, ...)` resolves a module's
//! sibling `.peg` file, generalized here to an explicit root directory instead
//! of Python's import machinery.

use std::io;
use std::path::{Path, PathBuf};

/// Resolve `name` (dot-separated, e.g. `"demos.rational"`) to a path under
/// `root` with a `.peg` extension, and read it.
///
/// `name` must not be empty and must not contain path separators once its dots
/// are split — this is a resource name, not an arbitrary path.
pub fn load_grammar(root: &Path, name: &str) -> io::Result<String> {
    let path = resource_path(root, name)?;
    std::fs::read_to_string(path)
}

fn resource_path(root: &Path, name: &str) -> io::Result<PathBuf> {
    if name.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "grammar resource name must not be empty",
        ));
    }
    let mut path = root.to_path_buf();
    for segment in name.split('.') {
        if segment.is_empty() || segment.contains('/') || segment.contains('\\') {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid grammar resource name segment: {segment:?}"),
            ));
        }
        path.push(segment);
    }
    path.set_extension("peg");
    Ok(path)
}

/// `resource <root> <dotted.name>`: resolve `dotted.name` to `<root>/dotted/name.peg`
/// and print its contents, the way a caller would before handing the text to
/// [`pegboot::create_parser`].
fn main() -> std::process::ExitCode {
    let mut args = std::env::args().skip(1);
    let (root, name) = match (args.next(), args.next()) {
        (Some(r), Some(n)) => (r, n),
        _ => {
            eprintln!("usage: resource <root-dir> <dotted.resource.name>");
            return std::process::ExitCode::FAILURE;
        }
    };
    match load_grammar(Path::new(&root), &name) {
        Ok(source) => {
            print!("{source}");
            std::process::ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("failed to load {name:?} under {root:?}: {err}");
            std::process::ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_a_dotted_name_under_a_root() {
        let path = resource_path(Path::new("/grammars"), "demos.rational").unwrap();
        assert_eq!(path, Path::new("/grammars/demos/rational.peg"));
    }

    #[test]
    fn rejects_an_empty_name() {
        assert!(resource_path(Path::new("/grammars"), "").is_err());
    }

    #[test]
    fn rejects_a_segment_that_looks_like_a_path() {
        assert!(resource_path(Path::new("/grammars"), "a/b").is_err());
    }
}
