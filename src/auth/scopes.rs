use std::collections::BTreeSet;
use std::fmt;

/// 路由声明的权限范围集合，空集合表示公开路由
/// Scope set declared by a route; an empty set marks a public route
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequiredScopes(BTreeSet<String>);

impl RequiredScopes {
    pub fn new<I, S>(scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(
            scopes
                .into_iter()
                .map(Into::into)
                .filter(|s: &String| !s.is_empty())
                .collect(),
        )
    }

    pub fn public() -> Self {
        Self::default()
    }

    pub fn is_public(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, scope: &str) -> bool {
        self.0.contains(scope)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>, const N: usize> From<[S; N]> for RequiredScopes {
    fn from(scopes: [S; N]) -> Self {
        Self::new(scopes)
    }
}

impl<S: Into<String>> FromIterator<S> for RequiredScopes {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl fmt::Display for RequiredScopes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<&str> = self.iter().collect();
        write!(f, "[{}]", joined.join(", "))
    }
}
