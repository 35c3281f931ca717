//! Location tracking for errors raised while walking expression trees.
//!
//! Paths are stored as parent links and only rendered when an error is
//! reported, so walking a deep tree stays linear in its size.

use serde_json::Value;

#[derive(Debug, Clone, Copy)]
enum Step<'a> {
    Root(&'static str),
    Key(&'a str),
    Index(usize),
}

/// Arena of path steps; a step is addressed by its index.
#[derive(Debug)]
pub(crate) struct PathTrail<'a> {
    steps: Vec<(Option<usize>, Step<'a>)>,
}

impl<'a> PathTrail<'a> {
    /// Create a trail whose root step is `name`. The root has index 0.
    pub(crate) fn new(name: &'static str) -> Self {
        Self {
            steps: vec![(None, Step::Root(name))],
        }
    }

    pub(crate) const ROOT: usize = 0;

    pub(crate) fn key(&mut self, parent: usize, key: &'a str) -> usize {
        self.steps.push((Some(parent), Step::Key(key)));
        self.steps.len() - 1
    }

    pub(crate) fn index(&mut self, parent: usize, index: usize) -> usize {
        self.steps.push((Some(parent), Step::Index(index)));
        self.steps.len() - 1
    }

    /// Render the path ending at `at`, e.g. `where.$and[1].age`.
    pub(crate) fn render(&self, at: usize) -> String {
        let mut chain = Vec::new();
        let mut cursor = Some(at);
        while let Some(idx) = cursor {
            let Some((parent, step)) = self.steps.get(idx) else {
                break;
            };
            chain.push(*step);
            cursor = *parent;
        }

        let mut rendered = String::new();
        for step in chain.iter().rev() {
            match step {
                Step::Root(name) => rendered.push_str(name),
                Step::Key(key) => {
                    rendered.push('.');
                    rendered.push_str(key);
                }
                Step::Index(index) => rendered.push_str(&format!("[{index}]")),
            }
        }
        rendered
    }
}

/// Shallow, non-recursive description of a value for error messages.
pub(crate) fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("{s:?}"),
        Value::Array(items) => format!("a list of {} item(s)", items.len()),
        Value::Object(map) => {
            let keys: Vec<&str> = map.keys().map(|k| k.as_str()).collect();
            format!("a mapping with keys [{}]", keys.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_render_nested_path() {
        let mut trail = PathTrail::new("where");
        let and = trail.key(PathTrail::ROOT, "$and");
        let second = trail.index(and, 1);
        let age = trail.key(second, "age");

        assert_eq!(trail.render(age), "where.$and[1].age");
        assert_eq!(trail.render(PathTrail::ROOT), "where");
    }

    #[test]
    fn test_describe_is_shallow() {
        assert_eq!(describe(&json!("x")), "\"x\"");
        assert_eq!(describe(&json!([1, 2])), "a list of 2 item(s)");
        assert_eq!(
            describe(&json!({"$gt": {"deep": [1]}})),
            "a mapping with keys [$gt]"
        );
    }
}
