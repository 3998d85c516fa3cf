/// Rendering of declarations for completion labels, details and Qt
/// connection strings.
use super::symbols::{FunctionInfo, Param, Symbol, SymbolKind};

/// What to include when rendering a function.
#[derive(Debug, Clone, Copy, Default)]
pub struct Overview {
    pub show_return_type: bool,
    pub show_argument_names: bool,
    pub show_default_values: bool,
}

impl Overview {
    pub fn full() -> Self {
        Self {
            show_return_type: true,
            show_argument_names: true,
            show_default_values: true,
        }
    }

    /// `(int a, int b = 0) const`
    pub fn parameter_list(&self, f: &FunctionInfo) -> String {
        let mut out = String::from("(");
        for (i, param) in f.params.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            out.push_str(&self.parameter(param));
        }
        if f.is_variadic {
            if !f.params.is_empty() {
                out.push_str(", ");
            }
            out.push_str("...");
        }
        out.push(')');
        if f.is_const {
            out.push_str(" const");
        }
        if f.is_volatile {
            out.push_str(" volatile");
        }
        out
    }

    pub fn parameter(&self, param: &Param) -> String {
        let name = match (self.show_argument_names, param.name) {
            (true, Some(name)) => name.to_string(),
            _ => String::new(),
        };
        let mut out = param.ty.pretty_with_name(&name);
        if self.show_default_values
            && let Some(value) = &param.default_value
        {
            out.push_str(" = ");
            out.push_str(value.trim());
        }
        out
    }

    /// `void name(int a) const`
    pub fn function(&self, name: &str, f: &FunctionInfo) -> String {
        let mut out = String::new();
        if self.show_return_type
            && let Some(ret) = &f.return_type
        {
            out.push_str(&ret.pretty());
            if !out.ends_with('*') && !out.ends_with('&') {
                out.push(' ');
            }
        }
        out.push_str(name);
        out.push_str(&self.parameter_list(f));
        out
    }
}

/// A one-line description of a symbol for completion details.
pub fn symbol_detail(sym: &Symbol) -> String {
    let name = sym.name_str();
    match &sym.kind {
        SymbolKind::Function(f) => Overview::full().function(name, f),
        SymbolKind::Variable { ty, .. } | SymbolKind::Parameter { ty, .. } => {
            ty.pretty_with_name(name)
        }
        SymbolKind::Class(info) => {
            let key = match info.key {
                super::symbols::ClassKey::Class => "class",
                super::symbols::ClassKey::Struct => "struct",
                super::symbols::ClassKey::Union => "union",
            };
            format!("{key} {name}")
        }
        SymbolKind::Namespace { .. } => format!("namespace {name}"),
        SymbolKind::NamespaceAlias { target } => format!("namespace {name} = {target}"),
        SymbolKind::Enum { scoped, .. } => {
            if *scoped {
                format!("enum class {name}")
            } else {
                format!("enum {name}")
            }
        }
        SymbolKind::Typedef { ty } => format!("typedef {}", ty.pretty_with_name(name)),
        SymbolKind::UsingDeclaration { target } => format!("using {target}"),
        SymbolKind::QtProperty => format!("Q_PROPERTY {name}"),
        SymbolKind::QtEnum => format!("Q_ENUM {name}"),
        SymbolKind::Enumerator
        | SymbolKind::TemplateParameter
        | SymbolKind::UsingDirective { .. }
        | SymbolKind::Friend => name.to_string(),
    }
}

/// The signature Qt's meta-object system stores for `name(params)`:
/// parameter types only, whitespace collapsed, `const T &` reduced to `T`.
pub fn qt_normalized_signature(name: &str, params: &[Param]) -> String {
    let types: Vec<String> = params
        .iter()
        .map(|p| normalize_type(&p.ty.pretty()))
        .collect();
    format!("{}({})", name, types.join(","))
}

/// Normalize one type spelling the way `QMetaObject::normalizedSignature`
/// does for the common cases.
pub fn normalize_type(text: &str) -> String {
    let mut compact = String::new();
    let mut prev: Option<char> = None;
    let mut pending_space = false;
    for c in text.trim().chars() {
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space
            && prev.is_some_and(|p| p.is_alphanumeric() || p == '_')
            && (c.is_alphanumeric() || c == '_')
        {
            compact.push(' ');
        }
        pending_space = false;
        compact.push(c);
        prev = Some(c);
    }
    // `>>` in template arguments stays separated.
    let compact = compact.replace(">>", "> >");
    if let Some(inner) = compact.strip_prefix("const ")
        && let Some(inner) = inner.strip_suffix('&')
        && !inner.ends_with('&')
        && !inner.ends_with('*')
    {
        return inner.to_string();
    }
    compact
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::symbols::FullySpecifiedType;
    use ustr::Ustr;

    fn param(ty: &str, name: &str, default: Option<&str>) -> Param {
        Param {
            name: Some(Ustr::from(name)),
            ty: FullySpecifiedType::parse(ty),
            default_value: default.map(str::to_string),
        }
    }

    #[test]
    fn test_function_rendering() {
        let f = FunctionInfo {
            return_type: Some(FullySpecifiedType::parse("QString *")),
            params: vec![param("int", "a", None), param("const QString &", "s", Some("QString()"))],
            is_const: true,
            ..FunctionInfo::default()
        };
        assert_eq!(
            Overview::full().function("make", &f),
            "QString *make(int a, const QString &s = QString()) const"
        );
        let bare = Overview::default();
        assert_eq!(bare.function("make", &f), "make(int, const QString &) const");
    }

    #[test]
    fn test_qt_normalization() {
        let params = vec![
            param("const QString &", "text", None),
            param("int", "n", None),
            param("const char *", "p", None),
        ];
        assert_eq!(
            qt_normalized_signature("changed", &params),
            "changed(QString,int,const char*)"
        );
        assert_eq!(qt_normalized_signature("done", &[]), "done()");
        assert_eq!(normalize_type("QList<QList<int> >"), "QList<QList<int> >");
        assert_eq!(normalize_type("unsigned  int"), "unsigned int");
    }
}
