use crate::{
    error::InternalError,
    index::{ChangeIndex, InstanceRecord},
    summary::ChangeSummary,
    types::ClassId,
    value::{ValueRenderKind, render_value},
};
use std::fmt::Write;

impl<I: ChangeIndex> ChangeSummary<'_, I> {
    /// Human-readable report of every changed instance and its values.
    ///
    /// ```text
    /// Fixture.Element:10 0:7 Update direct elements
    ///     Name: A -> B
    /// ```
    pub fn dump(&self) -> Result<String, InternalError> {
        let mut out = String::new();

        for record in self.index.records() {
            let record = record?;
            self.dump_instance(&mut out, &record);

            for value in self.index.values(record.key) {
                let value = value?;
                let kind = ValueRenderKind::for_access_path(&value.access_path);
                let _ = writeln!(
                    out,
                    "    {}: {} -> {}",
                    value.access_path,
                    render_value(value.old.as_ref(), kind, |id| self.class_name(id)),
                    render_value(value.new.as_ref(), kind, |id| self.class_name(id)),
                );
            }
        }

        Ok(out)
    }

    fn dump_instance(&self, out: &mut String, record: &InstanceRecord) {
        let class_id = record.class_id();
        let class = match self.catalog.class_name(class_id) {
            Some(name) => format!("{name}:{class_id}"),
            None => class_id.to_string(),
        };
        let instance_id = record.instance_id();

        let _ = writeln!(
            out,
            "{class} {}:{} {} {} {}",
            instance_id.briefcase_id(),
            instance_id.local_id(),
            record.op,
            if record.indirect { "indirect" } else { "direct" },
            record.table,
        );
    }

    fn class_name(&self, raw: u64) -> Option<String> {
        self.catalog.class_name(ClassId::new(raw))
    }
}
