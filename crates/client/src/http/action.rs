use std::fmt;

/// Action token sent with every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Find,
    FindAll,
    FindAny,
    FindQuery,
    New,
    Edit,
    Delete,
    View,
    DbNames,
    LayoutNames,
    ScriptNames,
}

impl Action {
    pub fn token(self) -> &'static str {
        match self {
            Action::Find => "-find",
            Action::FindAll => "-findall",
            Action::FindAny => "-findany",
            Action::FindQuery => "-findquery",
            Action::New => "-new",
            Action::Edit => "-edit",
            Action::Delete => "-delete",
            Action::View => "-view",
            Action::DbNames => "-dbnames",
            Action::LayoutNames => "-layoutnames",
            Action::ScriptNames => "-scriptnames",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}
