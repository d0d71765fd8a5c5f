//! `fln resolve`: resolve one line of one file, outside any defect batch.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::cli::{AppContext, ResolveArgs};
use crate::core::identity::MethodIdentity;
use crate::core::source::ScopeParser;
use crate::infra::io::read_source;
use crate::parsers::python_parser::PythonScopeParser;

/// JSON shape printed by `fln resolve`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedLine
{
    pub name: String,
    pub signature: String,
    pub class_name: String,
    pub function: String,
    pub begin_line: usize,
    pub end_line: usize,
}

/// Resolve `line` of `text`; `rel_path` is the identity path
pub fn resolve_line(
    parser: &dyn ScopeParser,
    rel_path: &str,
    text: &str,
    line: usize,
) -> Result<Option<ResolvedLine>>
{
    let scopes = parser.parse_scopes(rel_path, text)?;
    let Some(resolution) = scopes.resolve(line)
    else
    {
        return Ok(None);
    };

    let identity = MethodIdentity::from_resolution(rel_path, &resolution);
    let function = resolution.function;
    Ok(Some(ResolvedLine {
        name: identity.to_string(),
        signature: identity
            .signature(&function.params)
            .to_string(),
        class_name: identity
            .pseudo_class_path
            .clone(),
        function: function
            .name
            .clone(),
        begin_line: function.start_line,
        end_line: function.end_line,
    }))
}

/// Identity path: FILE relative to `root` when given, `/`-separated
fn identity_path(
    file: &Path,
    root: Option<&Path>,
) -> Result<String>
{
    let rel = match root
    {
        Some(root) => file
            .strip_prefix(root)
            .with_context(|| format!("{} is not under {}", file.display(), root.display()))?,
        None => file,
    };

    let parts: Vec<String> = rel
        .components()
        .filter_map(|c| match c
        {
            std::path::Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    Ok(parts.join("/"))
}

pub fn run(
    args: ResolveArgs,
    _ctx: &AppContext,
) -> Result<()>
{
    let rel = identity_path(&args.file, args.root.as_deref())?;
    let text = read_source(&args.file, &rel)?;
    let parser = PythonScopeParser::new()?;

    let resolved = resolve_line(&parser, &rel, &text, args.line)?;
    println!(
        "{}",
        serde_json::to_string_pretty(&resolved).context("Failed to serialize resolution")?
    );
    Ok(())
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn resolves_method_with_class_path()
    {
        let parser = PythonScopeParser::new().unwrap();
        let src = "class C:\n    x = 1\n    def foo(x):\n        return x\n";
        let r = resolve_line(&parser, "pkg/a.py", src, 4)
            .unwrap()
            .unwrap();
        assert_eq!(r.name, "pkg.a.C.foo#3");
        assert_eq!(r.signature, "pkg.a.C.foo(x)");
        assert_eq!(r.class_name, "pkg.a.C");
        assert_eq!((r.begin_line, r.end_line), (3, 4));

        assert!(
            resolve_line(&parser, "pkg/a.py", src, 2)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn identity_path_is_relative_and_slash_separated()
    {
        let p = identity_path(Path::new("snap/lib/mod.py"), Some(Path::new("snap"))).unwrap();
        assert_eq!(p, "lib/mod.py");
        assert_eq!(identity_path(Path::new("./a.py"), None).unwrap(), "a.py");
        assert!(identity_path(Path::new("x/a.py"), Some(Path::new("y"))).is_err());
    }
}
