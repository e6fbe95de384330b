/*
 * burner.kiwi disposable mail service
 * Copyright (C) 2022 viridIT SAS
 *
 * This program is free software: you can redistribute it and/or modify it under
 * the terms of the GNU General Public License as published by the Free Software
 * Foundation, either version 3 of the License, or any later version.
 *
 * This program is distributed in the hope that it will be useful, but WITHOUT
 * ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
 * FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License along with
 * this program. If not, see https://www.gnu.org/licenses/.
 *
*/
use burner_common::{
    re::{
        anyhow::{self, Context},
        async_trait,
    },
    Inbox,
};

const API_BASE: &str = "https://api.mailgun.net/v3";

/// A route as listed by the provider.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct Route {
    ///
    pub id: String,
    /// expiry of the route, in unix seconds
    #[serde(default)]
    pub description: String,
    ///
    #[serde(default)]
    pub expression: String,
}

/// One page of the route listing.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct RoutePage {
    ///
    pub total_count: usize,
    ///
    pub items: Vec<Route>,
}

/// A route to create, forwarding the mail of one inbox to the webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRoute {
    ///
    pub priority: u32,
    /// expiry of the route, in unix seconds
    pub description: String,
    ///
    pub expression: String,
    ///
    pub actions: Vec<String>,
}

impl NewRoute {
    /// The route of `inbox`, expiring with it.
    #[must_use]
    pub fn for_inbox(inbox: &Inbox, website_url: &str) -> Self {
        Self {
            priority: 0,
            description: inbox.ttl.to_string(),
            expression: format!("match_recipient(\"{}\")", inbox.address),
            actions: vec![
                format!(
                    "forward(\"{}/mg/incoming/{}/\")",
                    website_url.trim_end_matches('/'),
                    inbox.id
                ),
                "stop()".to_string(),
            ],
        }
    }

    fn form(&self) -> Vec<(&'static str, String)> {
        let mut form = vec![
            ("priority", self.priority.to_string()),
            ("description", self.description.clone()),
            ("expression", self.expression.clone()),
        ];
        form.extend(self.actions.iter().map(|action| ("action", action.clone())));
        form
    }
}

/// The routes endpoints of the provider.
#[async_trait::async_trait]
pub trait RouteApi: Send + Sync {
    /// Create a route, returns its identifier.
    async fn create_route(&self, route: &NewRoute) -> anyhow::Result<String>;

    /// List `limit` routes starting at `skip`.
    async fn list_routes(&self, skip: usize, limit: usize) -> anyhow::Result<RoutePage>;

    ///
    async fn delete_route(&self, id: &str) -> anyhow::Result<()>;

    /// Is `domain` registered on the account.
    async fn check_domain(&self, domain: &str) -> anyhow::Result<()>;
}

/// [`RouteApi`] over the Mailgun http api.
pub struct HttpRouteApi {
    client: reqwest::Client,
    key: String,
    base: String,
}

#[derive(serde::Deserialize)]
struct CreatedRoute {
    route: Route,
}

impl HttpRouteApi {
    /// Client authenticated with the api `key`.
    ///
    /// # Errors
    ///
    /// * the tls backend cannot be initialized
    pub fn new(key: &str) -> anyhow::Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()?,
            key: key.to_string(),
            base: API_BASE.to_string(),
        })
    }
}

#[async_trait::async_trait]
impl RouteApi for HttpRouteApi {
    async fn create_route(&self, route: &NewRoute) -> anyhow::Result<String> {
        let created = self
            .client
            .post(format!("{}/routes", self.base))
            .basic_auth("api", Some(&self.key))
            .form(&route.form())
            .send()
            .await?
            .error_for_status()
            .context("mailgun refused the route")?
            .json::<CreatedRoute>()
            .await?;

        Ok(created.route.id)
    }

    async fn list_routes(&self, skip: usize, limit: usize) -> anyhow::Result<RoutePage> {
        Ok(self
            .client
            .get(format!("{}/routes", self.base))
            .basic_auth("api", Some(&self.key))
            .query(&[("skip", skip), ("limit", limit)])
            .send()
            .await?
            .error_for_status()
            .context("mailgun refused to list the routes")?
            .json::<RoutePage>()
            .await?)
    }

    async fn delete_route(&self, id: &str) -> anyhow::Result<()> {
        self.client
            .delete(format!("{}/routes/{id}", self.base))
            .basic_auth("api", Some(&self.key))
            .send()
            .await?
            .error_for_status()
            .with_context(|| format!("mailgun refused to delete the route '{id}'"))?;
        Ok(())
    }

    async fn check_domain(&self, domain: &str) -> anyhow::Result<()> {
        self.client
            .get(format!("{}/domains/{domain}", self.base))
            .basic_auth("api", Some(&self.key))
            .send()
            .await?
            .error_for_status()
            .with_context(|| format!("the domain '{domain}' is not usable with this key"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn route_of_inbox() {
        let inbox = Inbox::new("bobby@example.com".to_string(), String::new(), 1000);
        let route = NewRoute::for_inbox(&inbox, "https://burner.kiwi/");

        assert_eq!(
            route.form(),
            vec![
                ("priority", "0".to_string()),
                ("description", "87400".to_string()),
                (
                    "expression",
                    "match_recipient(\"bobby@example.com\")".to_string()
                ),
                (
                    "action",
                    format!("forward(\"https://burner.kiwi/mg/incoming/{}/\")", inbox.id)
                ),
                ("action", "stop()".to_string()),
            ]
        );
    }

    #[test]
    fn route_listing() {
        let page = burner_common::re::serde_json::from_str::<RoutePage>(
            r#"{
                "total_count": 1,
                "items": [{
                    "actions": ["forward(\"https://burner.kiwi/mg/incoming/abc/\")", "stop()"],
                    "created_at": "Wed, 15 Feb 2012 13:03:31 GMT",
                    "description": "1529006854",
                    "expression": "match_recipient(\"bobby@example.com\")",
                    "id": "4f3bad2335335426750048c6",
                    "priority": 0
                }]
            }"#,
        )
        .unwrap();

        assert_eq!(page.total_count, 1);
        assert_eq!(page.items[0].id, "4f3bad2335335426750048c6");
        assert_eq!(page.items[0].description, "1529006854");
    }
}
