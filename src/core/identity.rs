//! Stable method identities and signatures.
//!
//! Identity: `<dotted path>[.<Class>].<func>#<def line>`, unique per function
//! definition within one snapshot. Signature: the identity without the
//! `#line` suffix plus the rendered parameter list, used to join sources whose
//! line numbers may have drifted.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::scope::{Resolution, ScopeInterval};

/// Identity of one resolved function definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodIdentity
{
    /// Dotted file path, suffixed with the enclosing class when present
    pub pseudo_class_path: String,
    pub function_name: String,
    pub def_line: usize,
}

/// Cross-source join key: `pkg.mod.Class.method(self, x, y=1)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature(String);

impl Signature
{
    pub fn as_str(&self) -> &str
    {
        &self.0
    }
}

impl fmt::Display for Signature
{
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result
    {
        f.write_str(&self.0)
    }
}

impl From<String> for Signature
{
    fn from(s: String) -> Self
    {
        Self(s)
    }
}

impl From<&str> for Signature
{
    fn from(s: &str) -> Self
    {
        Self(s.to_string())
    }
}

impl MethodIdentity
{
    /// Build the identity of `function` declared in `path` inside `class_name`
    /// (empty for module-level functions).
    pub fn assign(
        path: &str,
        class_name: &str,
        function: &ScopeInterval,
    ) -> Self
    {
        let mut pseudo_class_path = dotted_module_path(path);
        if !class_name.is_empty()
        {
            pseudo_class_path.push('.');
            pseudo_class_path.push_str(class_name);
        }

        Self {
            pseudo_class_path,
            function_name: function
                .name
                .clone(),
            def_line: function.start_line,
        }
    }

    /// Identity for a resolved line in `path`
    pub fn from_resolution(
        path: &str,
        resolution: &Resolution<'_>,
    ) -> Self
    {
        Self::assign(path, resolution.class_name(), resolution.function)
    }

    /// Identity rendered without the `#line` disambiguator
    pub fn qualified_name(&self) -> String
    {
        format!("{}.{}", self.pseudo_class_path, self.function_name)
    }

    /// Signature from this identity and the function's parameter list
    pub fn signature(
        &self,
        params: &str,
    ) -> Signature
    {
        Signature(format!("{}({})", self.qualified_name(), params))
    }
}

impl fmt::Display for MethodIdentity
{
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result
    {
        write!(f, "{}.{}#{}", self.pseudo_class_path, self.function_name, self.def_line)
    }
}

/// `pkg/sub/mod.py` -> `pkg.sub.mod`
pub fn dotted_module_path(path: &str) -> String
{
    path.strip_suffix(".py")
        .unwrap_or(path)
        .replace('/', ".")
}
