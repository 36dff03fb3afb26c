use httpmock::MockServer;
use opensearch::OpenSearch;
use people_search::engine::client::connect;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Client talking plain HTTP to a mock OpenSearch node.
pub fn client_for(server: &MockServer) -> Arc<OpenSearch> {
    let url = Url::parse(&server.base_url()).expect("mock server url");
    Arc::new(connect(url, None, None, Duration::from_secs(5)).expect("client"))
}
