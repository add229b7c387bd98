use crate::value::ChangeValue;

///
/// ValueRenderKind
///
/// Display family picked from an access path suffix: identifier-carrying
/// paths are rendered as identifiers, everything else verbatim.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ValueRenderKind {
    InstanceId,
    ClassId,
    Plain,
}

impl ValueRenderKind {
    #[must_use]
    pub fn for_access_path(access_path: &str) -> Self {
        if access_path.ends_with("InstanceId") {
            Self::InstanceId
        } else if access_path.ends_with("ClassId") {
            Self::ClassId
        } else {
            Self::Plain
        }
    }
}

/// Render one value for diagnostics.
///
/// Instance ids print as `briefcase:local`, class ids as `Name:id` when the
/// name is known, absent values as `NULL`.
pub fn render_value(
    value: Option<&ChangeValue>,
    kind: ValueRenderKind,
    class_name: impl Fn(u64) -> Option<String>,
) -> String {
    let Some(value) = value.filter(|v| !v.is_null()) else {
        return "NULL".to_string();
    };

    match kind {
        ValueRenderKind::InstanceId => match value.as_instance_id() {
            Some(id) => format!("{}:{}", id.briefcase_id(), id.local_id()),
            None => value.to_string(),
        },
        ValueRenderKind::ClassId => match value.as_class_id() {
            Some(id) => match class_name(id.get()) {
                Some(name) => format!("{name}:{}", id.get()),
                None => id.get().to_string(),
            },
            None => value.to_string(),
        },
        ValueRenderKind::Plain => value.to_string(),
    }
}
