//! Rendered SQL text paired with its ordered parameter list.

use super::generator::QueryGenerator;
use super::DalError;
use crate::value::Value;
use std::collections::HashMap;
use std::fmt;

/// Named placeholder resolved at bind time.
///
/// A counted parameter renders `count` placeholders and binds from a list
/// of exactly that many values.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub count: Option<usize>,
}

impl Parameter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            count: None,
        }
    }

    pub fn counted(name: impl Into<String>, count: usize) -> Self {
        Self {
            name: name.into(),
            count: Some(count),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Value(Value),
    Parameter(Parameter),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    One(Value),
    Many(Vec<Value>),
}

/// Keyword values for named parameters.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    values: HashMap<String, Binding>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), Binding::One(value.into()));
        self
    }

    pub fn with_list<V: Into<Value>>(
        mut self,
        name: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.values.insert(name.into(), Binding::Many(values));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.values.get(name)
    }
}

/// SQL text plus arguments in placeholder occurrence order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlFragment {
    pub text: String,
    pub parameters: Vec<Argument>,
}

impl SqlFragment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            parameters: Vec::new(),
        }
    }

    pub fn push_str(&mut self, text: &str) {
        self.text.push_str(text);
    }

    pub fn append(&mut self, other: SqlFragment) {
        self.text.push_str(&other.text);
        self.parameters.extend(other.parameters);
    }

    /// Emit placeholder(s) for one argument.
    pub fn push_argument(&mut self, qg: &QueryGenerator, argument: Argument) {
        let count = match &argument {
            Argument::Parameter(Parameter {
                count: Some(count), ..
            }) => *count,
            _ => 1,
        };
        let placeholders: Vec<String> = (0..count).map(|_| qg.next_placeholder()).collect();
        self.text.push_str(&placeholders.join(", "));
        self.parameters.push(argument);
    }

    /// Concatenate fragments with `separator` between them.
    pub fn join(fragments: impl IntoIterator<Item = SqlFragment>, separator: &str) -> Self {
        let mut out = SqlFragment::new();
        for (i, fragment) in fragments.into_iter().enumerate() {
            if i > 0 {
                out.push_str(separator);
            }
            out.append(fragment);
        }
        out
    }

    pub fn in_parens(self) -> Self {
        let mut out = SqlFragment::from_text("(");
        out.append(self);
        out.push_str(")");
        out
    }

    /// Resolve every named parameter, expanding counted ones in place.
    pub fn bind(&self, bindings: &Bindings) -> Result<SqlFragment, DalError> {
        let mut parameters = Vec::with_capacity(self.parameters.len());
        for argument in &self.parameters {
            let parameter = match argument {
                Argument::Value(_) => {
                    parameters.push(argument.clone());
                    continue;
                }
                Argument::Parameter(p) => p,
            };
            let binding = bindings
                .get(&parameter.name)
                .ok_or_else(|| DalError::UnboundParameter(parameter.name.clone()))?;
            match (parameter.count, binding) {
                (None, Binding::One(value)) => parameters.push(Argument::Value(value.clone())),
                (Some(expected), Binding::Many(values)) => {
                    if values.len() != expected {
                        return Err(DalError::ParameterCount {
                            name: parameter.name.clone(),
                            expected,
                            got: values.len(),
                        });
                    }
                    parameters.extend(values.iter().cloned().map(Argument::Value));
                }
                _ => return Err(DalError::InvalidParameterCount(parameter.name.clone())),
            }
        }
        Ok(SqlFragment {
            text: self.text.clone(),
            parameters,
        })
    }

    /// Positional values; fails if any named parameter is still unbound.
    pub fn values(&self) -> Result<Vec<Value>, DalError> {
        self.parameters
            .iter()
            .map(|argument| match argument {
                Argument::Value(value) => Ok(value.clone()),
                Argument::Parameter(p) => Err(DalError::UnboundParameter(p.name.clone())),
            })
            .collect()
    }
}

impl fmt::Display for SqlFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment() -> SqlFragment {
        let qg = QueryGenerator::default();
        let mut frag = SqlFragment::from_text("select * from T where A = ");
        frag.push_argument(&qg, Argument::Value(Value::Int(1)));
        frag.push_str(" and B in (");
        frag.push_argument(&qg, Argument::Parameter(Parameter::counted("ids", 3)));
        frag.push_str(") and C = ");
        frag.push_argument(&qg, Argument::Parameter(Parameter::new("name")));
        frag
    }

    #[test]
    fn test_counted_parameter_placeholders() {
        let frag = fragment();
        assert_eq!(
            frag.text,
            "select * from T where A = %s and B in (%s, %s, %s) and C = %s"
        );
        assert_eq!(frag.parameters.len(), 3);
        assert!(frag.values().is_err());
    }

    #[test]
    fn test_bind_expands_in_order() {
        let bindings = Bindings::new()
            .with("name", "bob")
            .with_list("ids", [7, 8, 9]);
        let bound = fragment().bind(&bindings).unwrap();
        assert_eq!(
            bound.values().unwrap(),
            vec![
                Value::Int(1),
                Value::Int(7),
                Value::Int(8),
                Value::Int(9),
                Value::Text("bob".into()),
            ]
        );
    }

    #[test]
    fn test_bind_errors() {
        let frag = fragment();
        assert!(matches!(
            frag.bind(&Bindings::new().with_list("ids", [1, 2, 3])),
            Err(DalError::UnboundParameter(name)) if name == "name"
        ));
        assert!(matches!(
            frag.bind(&Bindings::new().with("name", "x").with_list("ids", [1])),
            Err(DalError::ParameterCount { expected: 3, got: 1, .. })
        ));
        assert!(matches!(
            frag.bind(&Bindings::new().with("name", "x").with("ids", 1)),
            Err(DalError::InvalidParameterCount(name)) if name == "ids"
        ));
    }
}
