//! Route tables for both deployment modes.
//!
//! | Route | Stages after logging | Target |
//! |---|---|---|
//! | `GET /` | none | liveness |
//! | `POST /login` | rate limit, required fields | users |
//! | `POST /add_user`, `DELETE /delete_user` | rate limit | users |
//! | `POST /logout` | authenticate | local |
//! | `/documents`, `/documents/{id}` | authenticate, authorize, rate limit | documents |
//! | `GET/POST /orders` | authenticate, authorize, rate limit | orders |
//! | `POST /reset_rate_limit` | none | local |

use std::sync::Arc;

use axum::http::Method;

use crate::config::GatewayConfig;
use crate::http::handlers::{
    Liveness, LoginHandler, LogoutHandler, ProxyHandler, ResetRateLimitHandler,
};
use crate::lifecycle::{BalancerComponents, GatewayComponents};
use crate::load_balancer::Service;
use crate::pipeline::{Authenticate, Authorize, Pipeline, RateLimit, RequireFields};
use crate::proxy::transform::{MobileDocumentSummary, MobileOrderSummary, OrderIdFilter};
use crate::routing::{MethodMatcher, RouteTable};

pub type Routes = RouteTable<Arc<Pipeline>>;

pub fn gateway_routes(components: &GatewayComponents, config: &GatewayConfig) -> Routes {
    let limit = config.rate_limit.enabled;
    let proxy = |service: Service| {
        ProxyHandler::new(
            components.services.pool(service).clone(),
            components.forwarder.clone(),
        )
    };
    let authenticate = || Authenticate::new(components.authenticator.clone());
    let authorize = || Authorize::new(components.policy.clone());
    let rate_limit = || RateLimit::new(components.limiter.clone());

    // Anonymous routes limit first; authenticated routes authenticate first.
    let protected = |name: &'static str, handler: ProxyHandler| {
        Arc::new(
            Pipeline::new(name, Arc::new(handler))
                .stage(authenticate())
                .stage(authorize())
                .stage_if(limit, rate_limit()),
        )
    };

    let liveness = Arc::new(Pipeline::new("liveness", Arc::new(Liveness)));

    let login = Arc::new(
        Pipeline::new(
            "login",
            Arc::new(LoginHandler::new(proxy(Service::Users), components.authenticator.clone())),
        )
        .stage_if(limit, rate_limit())
        .stage(RequireFields::new(&["username", "password"])),
    );

    let users = |name: &'static str| {
        Arc::new(Pipeline::new(name, Arc::new(proxy(Service::Users))).stage_if(limit, rate_limit()))
    };

    let logout = Arc::new(
        Pipeline::new("logout", Arc::new(LogoutHandler::new(components.authenticator.clone())))
            .stage(authenticate()),
    );

    let reset = Arc::new(Pipeline::new(
        "reset_rate_limit",
        Arc::new(ResetRateLimitHandler::new(
            components.limiter.clone(),
            components.authenticator.clone(),
        )),
    ));

    let documents = protected(
        "documents",
        proxy(Service::Documents).transform(MobileDocumentSummary),
    );
    let orders = protected(
        "orders",
        proxy(Service::Orders)
            .transform(OrderIdFilter)
            .transform(MobileOrderSummary),
    );

    RouteTable::new()
        .route("/", MethodMatcher::one_of(&[Method::GET, Method::HEAD]), liveness)
        .route("/login", MethodMatcher::one_of(&[Method::POST]), login)
        .route("/add_user", MethodMatcher::one_of(&[Method::POST]), users("add_user"))
        .route("/delete_user", MethodMatcher::one_of(&[Method::DELETE]), users("delete_user"))
        .route("/logout", MethodMatcher::one_of(&[Method::POST]), logout)
        .route("/reset_rate_limit", MethodMatcher::one_of(&[Method::POST]), reset)
        .route("/documents", MethodMatcher::one_of(&[Method::POST]), documents.clone())
        .route(
            "/documents/{id}",
            MethodMatcher::one_of(&[Method::GET, Method::PUT, Method::DELETE]),
            documents,
        )
        .route("/orders", MethodMatcher::one_of(&[Method::GET, Method::POST]), orders)
}

/// Front balancer: every path and method goes to the gateway pool.
pub fn balancer_routes(components: &BalancerComponents) -> Routes {
    let handler = ProxyHandler::new(components.pool.clone(), components.forwarder.clone());
    RouteTable::new().route(
        "/{*path}",
        MethodMatcher::one_of(&[
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
        ]),
        Arc::new(Pipeline::new("balance", Arc::new(handler))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::Resolution;

    fn stages(routes: &Routes, method: Method, path: &str) -> Vec<&'static str> {
        match routes.resolve(&method, path) {
            Resolution::Matched { target, .. } => target.stage_names(),
            other => panic!("{} {} did not match: {:?}", method, path, other),
        }
    }

    #[test]
    fn stage_order_per_route() {
        let config = GatewayConfig::default();
        let components = GatewayComponents::build(&config).unwrap();
        let routes = gateway_routes(&components, &config);

        assert!(stages(&routes, Method::GET, "/").is_empty());
        assert_eq!(stages(&routes, Method::POST, "/login"), vec!["rate_limit", "require_fields"]);
        assert_eq!(stages(&routes, Method::DELETE, "/delete_user"), vec!["rate_limit"]);
        assert_eq!(stages(&routes, Method::POST, "/logout"), vec!["authenticate"]);
        assert_eq!(
            stages(&routes, Method::GET, "/orders"),
            vec!["authenticate", "authorize", "rate_limit"]
        );
        assert_eq!(
            stages(&routes, Method::PUT, "/documents/abc"),
            vec!["authenticate", "authorize", "rate_limit"]
        );
        assert!(stages(&routes, Method::POST, "/reset_rate_limit").is_empty());
        assert!(matches!(
            routes.resolve(&Method::PUT, "/orders"),
            Resolution::MethodNotAllowed
        ));
    }

    #[test]
    fn disabled_rate_limit_drops_stage() {
        let mut config = GatewayConfig::default();
        config.rate_limit.enabled = false;
        let components = GatewayComponents::build(&config).unwrap();
        let routes = gateway_routes(&components, &config);
        assert_eq!(stages(&routes, Method::GET, "/orders"), vec!["authenticate", "authorize"]);
    }

    #[test]
    fn balancer_accepts_any_path() {
        let components = BalancerComponents::build(&GatewayConfig::default()).unwrap();
        let routes = balancer_routes(&components);
        assert!(stages(&routes, Method::PATCH, "/documents/1/anything").is_empty());
        assert!(matches!(
            routes.resolve(&Method::OPTIONS, "/x"),
            Resolution::MethodNotAllowed
        ));
    }
}
