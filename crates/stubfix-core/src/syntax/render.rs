//! Text generation for replacement fragments.

/// A name listed in a `from ... import` statement.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ImportAlias {
    pub name: String,
    pub asname: Option<String>,
}

impl ImportAlias {
    pub fn new(name: &str, asname: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            asname: asname.map(str::to_string),
        }
    }

    /// The name this alias binds in the importing module.
    pub fn bound_name(&self) -> &str {
        self.asname.as_deref().unwrap_or(&self.name)
    }

    pub fn render(&self) -> String {
        match &self.asname {
            Some(asname) => format!("{} as {}", self.name, asname),
            None => self.name.clone(),
        }
    }
}

/// `from <module> import a, b as c`
pub fn render_import_from(module: &str, names: &[ImportAlias]) -> String {
    let rendered: Vec<String> = names.iter().map(ImportAlias::render).collect();
    format!("from {module} import {}", rendered.join(", "))
}

/// Collapse runs of whitespace, and drop whitespace just inside brackets, so
/// multi-line expressions read as one line in messages.
pub fn normalize_expression(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .replace("( ", "(")
        .replace("[ ", "[")
        .replace(" )", ")")
        .replace(" ]", "]")
        .replace(",)", ")")
        .replace(",]", "]")
}
