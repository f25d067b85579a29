pub mod addr;
pub mod cidr;
pub mod coalesce;
