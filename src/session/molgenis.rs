use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, trace};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::RwLock;
use url::Url;

use super::{ClientSettings, DataSession, SessionError, SessionProvider};
use crate::catalogue::{Attribute, AttributeKind, EntityMeta, Record};

const TOKEN_HEADER: &str = "x-molgenis-token";

/// Page of rows returned by the v2 collection endpoint.
#[derive(Debug, Deserialize)]
struct RowsPage {
	#[serde(default)]
	items: Vec<Record>,
	#[serde(rename = "nextHref")]
	next_href: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MetaPage {
	meta: RawMeta,
}

#[derive(Debug, Deserialize)]
struct RawMeta {
	name: String,
	#[serde(default)]
	attributes: Vec<RawAttribute>,
}

#[derive(Debug, Deserialize)]
struct RawAttribute {
	name: String,
	#[serde(rename = "fieldType")]
	field_type: String,
	#[serde(rename = "refEntity")]
	ref_entity: Option<RawRefEntity>,
	/// Children of COMPOUND attributes.
	#[serde(default)]
	attributes: Vec<RawAttribute>,
}

#[derive(Debug, Deserialize)]
struct RawRefEntity {
	name: String,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
	token: Option<String>,
}

fn flatten_attributes(raw: Vec<RawAttribute>, out: &mut Vec<Attribute>) {
	for attr in raw {
		if attr.field_type == "COMPOUND" {
			flatten_attributes(attr.attributes, out);
			continue;
		}
		let kind = AttributeKind::from_field_type(&attr.field_type);
		out.push(Attribute {
			name: attr.name,
			kind,
			ref_entity: attr.ref_entity.map(|r| r.name),
		});
	}
}

/// Session against a MOLGENIS directory over its REST API.
pub struct MolgenisSession {
	base: Url,
	client: Client,
	settings: ClientSettings,
	token: RwLock<Option<String>>,
}

impl MolgenisSession {
	/// Create a session for the API root `base` (e.g.
	/// `https://directory.bbmri-eric.eu/api/`).
	pub fn new(base: &Url, settings: ClientSettings) -> Result<Self, SessionError> {
		let mut base = base.clone();
		if !base.path().ends_with('/') {
			let path = format!("{}/", base.path());
			base.set_path(&path);
		}

		let client = Client::builder().timeout(settings.timeout).build()?;

		Ok(Self {
			base,
			client,
			settings,
			token: RwLock::new(None),
		})
	}

	pub fn base_url(&self) -> &Url {
		&self.base
	}

	fn endpoint(&self, path: &str) -> Result<Url, SessionError> {
		Ok(self.base.join(path)?)
	}

	/// Build a request carrying the session token, if logged in.
	async fn request(&self, method: Method, url: Url) -> RequestBuilder {
		let builder = self.client.request(method, url);
		match self.token.read().await.as_deref() {
			Some(token) => builder.header(TOKEN_HEADER, token),
			None => builder,
		}
	}

	/// Send and turn non-success responses into [`SessionError::Status`].
	async fn send(&self, builder: RequestBuilder) -> Result<Response, SessionError> {
		let request = builder.build()?;
		let method = request.method().to_string();
		let url = request.url().to_string();
		trace!("{} {}", method, url);

		let response = self.client.execute(request).await?;
		let status = response.status();
		if status.is_success() {
			return Ok(response);
		}

		let body = response.text().await.unwrap_or_default();
		Err(SessionError::Status {
			method,
			url,
			status,
			body,
		})
	}
}

#[async_trait]
impl DataSession for MolgenisSession {
	async fn login(&self, username: &str, password: &str) -> Result<(), SessionError> {
		let url = self.endpoint("v1/login")?;
		let builder = self
			.client
			.post(url)
			.json(&json!({ "username": username, "password": password }));
		let response: LoginResponse = self.send(builder).await?.json().await?;
		let token = response.token.ok_or(SessionError::MissingToken)?;

		*self.token.write().await = Some(token);
		debug!("Logged in to {} as {}", self.base, username);
		Ok(())
	}

	async fn get_all_rows(&self, entity: &str) -> Result<Vec<Record>, SessionError> {
		let mut url = self.endpoint(&format!("v2/{entity}"))?;
		url.query_pairs_mut()
			.append_pair("num", &self.settings.page_size.to_string());

		let mut rows = Vec::new();
		loop {
			let builder = self.request(Method::GET, url).await;
			let page: RowsPage = self.send(builder).await?.json().await?;
			rows.extend(page.items);

			match page.next_href {
				// nextHref is host-relative (`/api/v2/...`) or absolute
				Some(next) => url = self.base.join(&next)?,
				None => break,
			}
		}

		debug!("Fetched {} rows from {}", rows.len(), entity);
		Ok(rows)
	}

	async fn get_entity_meta(&self, entity: &str) -> Result<EntityMeta, SessionError> {
		let mut url = self.endpoint(&format!("v2/{entity}"))?;
		url.query_pairs_mut().append_pair("num", "1");

		let builder = self.request(Method::GET, url).await;
		let response = self.send(builder).await?;
		let page: MetaPage = response.json().await.map_err(|e| SessionError::Decode {
			entity: entity.to_string(),
			message: e.to_string(),
		})?;

		let mut attributes = Vec::new();
		flatten_attributes(page.meta.attributes, &mut attributes);
		Ok(EntityMeta::new(page.meta.name, attributes))
	}

	async fn add_all(&self, entity: &str, rows: &[Record]) -> Result<usize, SessionError> {
		let url = self.endpoint(&format!("v2/{entity}"))?;
		let batch_size = self.settings.batch_size.max(1);

		for batch in rows.chunks(batch_size) {
			let builder = self
				.request(Method::POST, url.clone())
				.await
				.json(&json!({ "entities": batch }));
			self.send(builder).await?;
			debug!("Added {} rows to {}", batch.len(), entity);
		}

		Ok(rows.len())
	}

	async fn delete_rows(&self, entity: &str, ids: &[String]) -> Result<(), SessionError> {
		let url = self.endpoint(&format!("v2/{entity}"))?;
		let batch_size = self.settings.batch_size.max(1);

		for batch in ids.chunks(batch_size) {
			let builder = self
				.request(Method::DELETE, url.clone())
				.await
				.json(&json!({ "entityIds": batch }));
			self.send(builder).await?;
			debug!("Deleted {} rows from {}", batch.len(), entity);
		}

		Ok(())
	}
}

/// Opens anonymous [`MolgenisSession`]s on source directories.
#[derive(Debug, Clone, Default)]
pub struct MolgenisSessionProvider {
	settings: ClientSettings,
}

impl MolgenisSessionProvider {
	pub fn new(settings: ClientSettings) -> Self {
		Self { settings }
	}
}

impl SessionProvider for MolgenisSessionProvider {
	fn open(&self, source: &Url) -> Result<Arc<dyn DataSession>, SessionError> {
		Ok(Arc::new(MolgenisSession::new(source, self.settings.clone())?))
	}
}
