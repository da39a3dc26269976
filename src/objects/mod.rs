//! Typed views of what the cluster API returns.
mod flow;
mod member;
mod status;
mod types;

pub use flow::flow_chart;
pub use member::{EtcdStatus, Member, MemberOptions};
pub use status::node_statuses;
pub use types::{
    headers_are_empty, ip_filter_is_empty, ClusterObject, FlowNode, GenericObject, GrpcMethod,
    GrpcRule, GrpcServer, Header, Host, HttpPath, HttpRule, HttpServer, IpFilter, ObjectGroups,
    Pipeline, RouteSummary, KIND_GRPC_SERVER, KIND_HTTP_SERVER, KIND_PIPELINE,
};
