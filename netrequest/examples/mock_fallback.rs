use std::sync::Arc;

use bytes::Bytes;
use serde::Deserialize;

use netrequest::codec::{Codec, JsonCodec};
use netrequest::service::{HttpNetworkService, MockNetworkService, NetworkServiceGroup};
use netrequest::types::UrlParams;
use netrequest::{BoxError, NetworkServiceExt, Request};

#[derive(Debug, Clone, Deserialize)]
struct Todo {
    id: u64,
    title: String,
    completed: bool,
}

struct GetTodo {
    id: u64,
}

impl Request for GetTodo {
    type Response = Todo;

    fn path(&self) -> String {
        format!("/todos/{}", self.id)
    }

    fn decode_response(&self, body: &Bytes, _status: u16) -> Result<Todo, BoxError> {
        JsonCodec.decode(body)
    }
}

struct ListTodos {
    user_id: Option<u64>,
}

impl Request for ListTodos {
    type Response = Vec<Todo>;

    fn path(&self) -> String {
        "/todos".into()
    }

    fn url_params(&self) -> UrlParams {
        UrlParams::new().with_opt("userId", self.user_id)
    }

    fn decode_response(&self, body: &Bytes, _status: u16) -> Result<Vec<Todo>, BoxError> {
        JsonCodec.decode(body)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let mocks = MockNetworkService::new();
    mocks.mock_data(
        &GetTodo { id: 1 },
        r#"{"id":1,"title":"answered by the mock","completed":true}"#,
    );

    let http = HttpNetworkService::builder()
        .base_url("https://jsonplaceholder.typicode.com")
        .build()?;

    let service = NetworkServiceGroup::new(vec![Arc::new(mocks), Arc::new(http)]);

    let mocked = service.send(GetTodo { id: 1 }).await?;
    println!("#{} {} (done: {})", mocked.id, mocked.title, mocked.completed);

    let fetched = service.send(GetTodo { id: 2 }).await?;
    println!("#{} {} (done: {})", fetched.id, fetched.title, fetched.completed);

    let todos = service.send(ListTodos { user_id: Some(1) }).await?;
    println!("user 1 has {} todos", todos.len());

    Ok(())
}
