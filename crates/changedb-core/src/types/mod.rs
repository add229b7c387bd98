//! Identifier and opcode vocabulary shared by every layer of the engine.

mod id;
mod op;


pub use id::{ClassId, InstanceId, InstanceKey};
pub use op::{OpMask, RelationshipEnd, RowOp, Stage};
