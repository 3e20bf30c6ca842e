use sbeprims_codec::{FieldValue, MessageHeader};
use sbeprims_ir::{Field, Group, Message, VarData};

/// Callbacks invoked in wire order while a message is decoded on the fly.
///
/// Every method has a no-op default, so implementors override only what they
/// need. Fields, groups and var-data the acting version does not carry are
/// not reported; fields it carries but the encoder did not write are
/// reported as [`FieldValue::Null`].
pub trait Visitor {
    /// `header` is `None` when decoding a bare block by template id.
    fn on_begin_message(&mut self, _message: &Message, _header: Option<&MessageHeader>) {}

    fn on_field(&mut self, _field: &Field, _value: &FieldValue) {}

    fn on_begin_group(&mut self, _group: &Group, _count: usize) {}

    fn on_begin_group_element(&mut self, _group: &Group, _index: usize) {}

    fn on_end_group_element(&mut self, _group: &Group, _index: usize) {}

    fn on_end_group(&mut self, _group: &Group) {}

    /// `bytes` borrows the payload from the decode buffer.
    fn on_var_data(&mut self, _data: &VarData, _bytes: &[u8]) {}

    fn on_end_message(&mut self, _message: &Message) {}
}

impl<V: Visitor + ?Sized> Visitor for &mut V {
    fn on_begin_message(&mut self, message: &Message, header: Option<&MessageHeader>) {
        (**self).on_begin_message(message, header)
    }

    fn on_field(&mut self, field: &Field, value: &FieldValue) {
        (**self).on_field(field, value)
    }

    fn on_begin_group(&mut self, group: &Group, count: usize) {
        (**self).on_begin_group(group, count)
    }

    fn on_begin_group_element(&mut self, group: &Group, index: usize) {
        (**self).on_begin_group_element(group, index)
    }

    fn on_end_group_element(&mut self, group: &Group, index: usize) {
        (**self).on_end_group_element(group, index)
    }

    fn on_end_group(&mut self, group: &Group) {
        (**self).on_end_group(group)
    }

    fn on_var_data(&mut self, data: &VarData, bytes: &[u8]) {
        (**self).on_var_data(data, bytes)
    }

    fn on_end_message(&mut self, message: &Message) {
        (**self).on_end_message(message)
    }
}
