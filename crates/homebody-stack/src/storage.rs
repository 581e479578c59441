use homebody_aws::{Attribute, AttributeType, Table, TableProps};
use homebody_cloud::Stack;

pub const TABLE_ID: &str = "Appliances";
pub const TABLE_NAME: &str = "appliances";
pub const PARTITION_KEY: &str = "Id";

/// The appliances table, keyed by `Id`
pub fn create_table(stack: &mut Stack) -> Table {
    let mut props = TableProps::new(Attribute::new(PARTITION_KEY, AttributeType::String));
    props.table_name = Some(TABLE_NAME.to_string());
    Table::new(stack, TABLE_ID, props)
}
