use super::parser::{Directive, Parser};
use crate::{Error, ErrorKind, Source, SrcFile};

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The ordered directive stream spanning the entry file and all its includes,
/// plus the resolved file list in depth-first visitation order.
pub struct Resolution {
    pub directives: Vec<Directive>,
    pub files: Vec<PathBuf>,
}

/// Expands `include` directives depth-first, each file at most once.
///
/// The chain of files currently being resolved is kept explicitly: an include
/// that points back into the chain is a cycle and fails, while re-including a
/// file that already finished resolving elsewhere is deduplicated silently.
pub struct Resolver {
    root: PathBuf,
    chain: Vec<PathBuf>,
    visited: HashSet<PathBuf>,
}

impl Resolver {
    pub fn resolve(root: &Path, entry: &str) -> Result<Resolution, Error> {
        let entry_src = Source {
            file: Arc::new(root.join(entry).display().to_string()),
            start: (1, 1).into(),
            end: (1, 1).into(),
        };
        let root = root.canonicalize().map_err(|e| Error {
            kind: ErrorKind::Io {
                path: root.display().to_string(),
                reason: e.to_string(),
            },
            src: entry_src.clone(),
        })?;
        let entry_path = root.join(entry);
        let mut resolver = Resolver {
            root,
            chain: Vec::new(),
            visited: HashSet::new(),
        };
        let mut resolution = Resolution {
            directives: Vec::new(),
            files: Vec::new(),
        };
        resolver.load(&entry_path, entry_src, &mut resolution)?;
        Ok(resolution)
    }

    fn load(
        &mut self,
        path: &Path,
        refer_src: Source,
        out: &mut Resolution,
    ) -> Result<(), Error> {
        let canonical = path.canonicalize().map_err(|e| Error {
            kind: ErrorKind::Io {
                path: path.display().to_string(),
                reason: e.to_string(),
            },
            src: refer_src.clone(),
        })?;
        if let Some(pos) = self.chain.iter().position(|p| p == &canonical) {
            let mut cycle: Vec<String> = self.chain[pos..]
                .iter()
                .map(|p| p.display().to_string())
                .collect();
            cycle.push(canonical.display().to_string());
            return Err(Error {
                kind: ErrorKind::CyclicInclude { cycle },
                src: refer_src,
            });
        }
        if !self.visited.insert(canonical.clone()) {
            return Ok(());
        }
        let text = fs::read_to_string(&canonical).map_err(|e| Error {
            kind: ErrorKind::Io {
                path: canonical.display().to_string(),
                reason: e.to_string(),
            },
            src: refer_src,
        })?;
        let file: SrcFile = Arc::new(canonical.display().to_string());
        let directives = Parser::parse(&text, file)?;

        self.chain.push(canonical.clone());
        out.files.push(canonical.clone());
        for directive in directives {
            if let Directive::Include(include) = directive {
                let target = self.target_path(&canonical, &include.path);
                self.load(&target, include.src, out)?;
            } else {
                out.directives.push(directive);
            }
        }
        self.chain.pop();
        Ok(())
    }

    /// Relative include paths are anchored at the including file's directory;
    /// absolute paths are anchored at the ledger root.
    fn target_path(&self, including: &Path, include: &str) -> PathBuf {
        if Path::new(include).is_absolute() {
            self.root.join(include.trim_start_matches(['/', '\\']))
        } else {
            including
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(include)
        }
    }
}
