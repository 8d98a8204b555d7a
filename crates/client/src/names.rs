use {
    crate::{err::FileMakerError, Error},
    filemaker_sax::{Closed, Node, SaxError, Target},
};

/// Hook target collecting the first column of each row of an `FMPXMLRESULT`
/// response: database, layout or script names.
#[derive(Debug, Default)]
pub struct NameListBuilder {
    raise_on_401: bool,
    names: Vec<String>,
}

impl NameListBuilder {
    pub fn new(raise_on_401: bool) -> Self {
        Self {
            raise_on_401,
            names: Vec::new(),
        }
    }

    pub fn finish(self) -> Vec<String> {
        self.names
    }
}

fn first_column(row: &Node) -> Option<&str> {
    row.get("col")?
        .items()
        .next()?
        .get("data")?
        .items()
        .next()?
        .text()
}

impl Target for NameListBuilder {
    type Error = Error;

    fn before_close(&mut self, hook: &str, closed: &Closed<'_>) -> Result<(), Error> {
        match hook {
            "errorcode" => {
                let code = FileMakerError::parse_code(closed.node.text());
                FileMakerError::check(code, self.raise_on_401)?;
            }
            "row" => {
                if let Some(name) = first_column(closed.node) {
                    self.names.push(name.to_string());
                }
            }
            other => {
                return Err(SaxError::UnknownHook {
                    hook: other.to_string(),
                    tag: closed.tag.to_string(),
                }
                .into())
            }
        }
        Ok(())
    }
}
