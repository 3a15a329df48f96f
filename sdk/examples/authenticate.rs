use std::sync::Arc;

use codec::{Attribute, AttributeList, Code, Dictionary};
use radius_server_sdk::{Error, RadiusClient, Upstream};

/// Authenticate a user against a local radius server:
///
/// ```text
/// cargo run --example authenticate -- <server> <secret> <user> <password>
/// ```
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let server = args.next().unwrap_or_else(|| "127.0.0.1".to_string());
    let secret = args.next().unwrap_or_else(|| "testing123".to_string());
    let user = args.next().unwrap_or_else(|| "alice".to_string());
    let password = args.next().unwrap_or_else(|| "mypass".to_string());

    let dictionary = Arc::new(Dictionary::standard()?);

    let client = RadiusClient::builder(dictionary.clone())
        .with_server(Upstream::new(server.parse()?, secret))
        .build()?;

    let mut attributes = AttributeList::new();
    attributes.add(Attribute::new(dictionary.get("User-Name")?, user.as_str())?)?;
    attributes.add(Attribute::new(dictionary.get("User-Password")?, password.as_str())?)?;

    match client.request(Code::AccessRequest, attributes).await {
        Ok(response) => {
            println!("{}", response.code());
            for attribute in response.attributes() {
                println!("  {}", attribute);
            }
        }
        Err(Error::Rejected(response)) => {
            println!("{}", response.code());
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}
