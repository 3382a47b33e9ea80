//! Client-side router with an authentication guard.
//!
//! [`Router`] resolves locations against a route table, applies the guard, and keeps the
//! current location plus history. It implements [`Navigator`], which is the only view the
//! gateway has of navigation: when a session cannot be recovered the gateway pushes the
//! login route with the originally intended location as a `redirect` query value.

// crates.io
use url::form_urlencoded;
// self
use crate::{_prelude::*, session::SessionState};

/// Navigation collaborator used by the gateway for forced login redirects.
pub trait Navigator
where
	Self: Send + Sync,
{
	/// Location currently displayed.
	fn current(&self) -> NavigationTarget;

	/// Navigates to `target`.
	fn push(&self, target: NavigationTarget) -> Result<(), NavigationError>;

	/// Login route this navigator guards with, if it has one.
	///
	/// When set, it takes precedence over [`GatewayConfig::login_route`] for forced
	/// redirects.
	///
	/// [`GatewayConfig::login_route`]: crate::config::GatewayConfig::login_route
	fn login_route(&self) -> Option<&str> {
		None
	}
}

/// Errors raised while building a router or resolving a location.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum NavigationError {
	/// No route matches the path and no not-found route is configured.
	#[error("No route matches `{path}`.")]
	UnknownRoute {
		/// Requested path.
		path: String,
	},
	/// Route paths must be absolute.
	#[error("Route path `{path}` must start with `/`.")]
	InvalidRoute {
		/// Offending path.
		path: String,
	},
	/// Two routes share a name.
	#[error("Route name `{name}` is registered twice.")]
	DuplicateRoute {
		/// Duplicated name.
		name: String,
	},
	/// A route the guard redirects to is missing from the table.
	#[error("Guard target `{path}` is not a registered route.")]
	MissingGuardTarget {
		/// Missing path.
		path: String,
	},
	/// The login route itself requires authentication, which would loop.
	#[error("Login route `{path}` cannot require authentication.")]
	GuardedLoginRoute {
		/// Login route path.
		path: String,
	},
}

/// Who may view a route.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteAccess {
	/// Anyone.
	#[default]
	Public,
	/// Signed-in users only; others are sent to the login route.
	Authenticated,
	/// Signed-out users only (login, registration); others are sent home.
	Guest,
}

/// Entry in the route table. Segments starting with `:` capture parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
	/// Path pattern such as `/profile/:id`.
	pub path: String,
	/// Unique route name.
	pub name: String,
	/// Access rule enforced by the guard.
	#[serde(default)]
	pub access: RouteAccess,
}
impl Route {
	/// Creates a route.
	pub fn new(path: impl Into<String>, name: impl Into<String>, access: RouteAccess) -> Self {
		Self { path: path.into(), name: name.into(), access }
	}

	fn capture(&self, path: &str) -> Option<BTreeMap<String, String>> {
		let pattern = segments(&self.path);
		let actual = segments(path);

		if pattern.len() != actual.len() {
			return None;
		}

		let mut params = BTreeMap::new();

		for (expected, value) in pattern.into_iter().zip(actual) {
			match expected.strip_prefix(':') {
				Some(name) => {
					params.insert(name.to_owned(), value.to_owned());
				},
				None if expected == value => {},
				None => return None,
			}
		}

		Some(params)
	}
}

fn segments(path: &str) -> Vec<&str> {
	path.split('/').filter(|segment| !segment.is_empty()).collect()
}

/// Location with path and query parameters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NavigationTarget {
	/// Path component, always starting with `/`.
	pub path: String,
	/// Query parameters.
	#[serde(default)]
	pub query: BTreeMap<String, String>,
}
impl NavigationTarget {
	/// Creates a target without query parameters.
	pub fn new(path: impl Into<String>) -> Self {
		Self { path: path.into(), query: BTreeMap::new() }
	}

	/// Adds a query parameter.
	pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.insert(key.into(), value.into());

		self
	}

	/// Parses `path?query` into a target.
	pub fn parse(full_path: &str) -> Self {
		let (path, query) = full_path.split_once('?').unwrap_or((full_path, ""));

		Self {
			path: if path.is_empty() { "/".into() } else { path.to_owned() },
			query: form_urlencoded::parse(query.as_bytes()).into_owned().collect(),
		}
	}

	/// Renders `path?query` with the query form-encoded.
	pub fn full_path(&self) -> String {
		if self.query.is_empty() {
			return self.path.clone();
		}

		let query = form_urlencoded::Serializer::new(String::new()).extend_pairs(&self.query).finish();

		format!("{}?{query}", self.path)
	}
}
impl Display for NavigationTarget {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.full_path())
	}
}

/// Result of a successful navigation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedRoute {
	/// Matched route name.
	pub name: String,
	/// Final location after guard redirects.
	pub location: NavigationTarget,
	/// Captured path parameters.
	pub params: BTreeMap<String, String>,
	/// Whether the guard replaced the requested location.
	pub redirected: bool,
}

#[derive(Debug)]
struct RouterState {
	current: NavigationTarget,
	history: Vec<NavigationTarget>,
}

/// Route table plus auth guard and navigation history.
pub struct Router {
	routes: Vec<Route>,
	session: Arc<SessionState>,
	login_route: String,
	home_route: String,
	redirect_param: String,
	not_found: Option<String>,
	state: RwLock<RouterState>,
}
impl Router {
	/// Creates a builder whose guard reads authentication from `session`.
	pub fn builder(session: Arc<SessionState>) -> RouterBuilder {
		RouterBuilder::new(session)
	}

	/// Registered routes.
	pub fn routes(&self) -> &[Route] {
		&self.routes
	}

	/// Previously visited locations, oldest first.
	pub fn history(&self) -> Vec<NavigationTarget> {
		self.state.read().history.clone()
	}

	/// Resolves `target`, applies the guard, and makes the result current.
	pub fn navigate(&self, target: NavigationTarget) -> Result<ResolvedRoute, NavigationError> {
		let resolved = self.resolve(target)?;
		let mut state = self.state.write();
		let previous = std::mem::replace(&mut state.current, resolved.location.clone());

		state.history.push(previous);

		Ok(resolved)
	}

	/// Returns to the previous location, if any, without re-running the guard.
	pub fn back(&self) -> Option<NavigationTarget> {
		let mut state = self.state.write();
		let previous = state.history.pop()?;

		state.current = previous.clone();

		Some(previous)
	}

	/// Resolves `target` against the table and guard without navigating.
	pub fn resolve(&self, target: NavigationTarget) -> Result<ResolvedRoute, NavigationError> {
		let (route, params) = self.match_route(&target.path)?;
		let authenticated = self.session.is_authenticated();
		let redirect = match route.access {
			RouteAccess::Authenticated if !authenticated => Some(
				NavigationTarget::new(&self.login_route)
					.with_query(&self.redirect_param, target.full_path()),
			),
			RouteAccess::Guest if authenticated => Some(NavigationTarget::new(&self.home_route)),
			_ => None,
		};

		match redirect {
			Some(location) => {
				let (route, params) = self.match_route(&location.path)?;

				Ok(ResolvedRoute { name: route.name.clone(), location, params, redirected: true })
			},
			None => Ok(ResolvedRoute { name: route.name.clone(), location: target, params, redirected: false }),
		}
	}

	/// Where to go after a successful login: the preserved `redirect` value when it is a
	/// local path, otherwise the home route.
	pub fn post_login_target(&self) -> NavigationTarget {
		self.state
			.read()
			.current
			.query
			.get(&self.redirect_param)
			.filter(|value| value.starts_with('/') && !value.starts_with("//"))
			.map(|value| NavigationTarget::parse(value))
			.unwrap_or_else(|| NavigationTarget::new(&self.home_route))
	}

	fn match_route(&self, path: &str) -> Result<(&Route, BTreeMap<String, String>), NavigationError> {
		if let Some(found) =
			self.routes.iter().find_map(|route| route.capture(path).map(|params| (route, params)))
		{
			return Ok(found);
		}

		self.not_found
			.as_ref()
			.and_then(|name| self.routes.iter().find(|route| &route.name == name))
			.map(|route| (route, BTreeMap::new()))
			.ok_or_else(|| NavigationError::UnknownRoute { path: path.to_owned() })
	}
}
impl Navigator for Router {
	fn current(&self) -> NavigationTarget {
		self.state.read().current.clone()
	}

	fn push(&self, target: NavigationTarget) -> Result<(), NavigationError> {
		self.navigate(target).map(|_| ())
	}

	fn login_route(&self) -> Option<&str> {
		Some(&self.login_route)
	}
}
impl Debug for Router {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Router")
			.field("routes", &self.routes)
			.field("login_route", &self.login_route)
			.field("home_route", &self.home_route)
			.field("state", &*self.state.read())
			.finish()
	}
}

/// Builder for [`Router`] values.
pub struct RouterBuilder {
	session: Arc<SessionState>,
	routes: Vec<Route>,
	login_route: String,
	home_route: String,
	redirect_param: String,
	not_found: Option<String>,
	initial: NavigationTarget,
}
impl RouterBuilder {
	fn new(session: Arc<SessionState>) -> Self {
		Self {
			session,
			routes: Vec::new(),
			login_route: "/login".into(),
			home_route: "/".into(),
			redirect_param: "redirect".into(),
			not_found: None,
			initial: NavigationTarget::new("/"),
		}
	}

	/// Registers a route.
	pub fn route(
		mut self,
		path: impl Into<String>,
		name: impl Into<String>,
		access: RouteAccess,
	) -> Self {
		self.routes.push(Route::new(path, name, access));

		self
	}

	/// Overrides the login route (defaults to `/login`).
	pub fn login_route(mut self, path: impl Into<String>) -> Self {
		self.login_route = path.into();

		self
	}

	/// Overrides the home route (defaults to `/`).
	pub fn home_route(mut self, path: impl Into<String>) -> Self {
		self.home_route = path.into();

		self
	}

	/// Overrides the redirect query parameter (defaults to `redirect`).
	pub fn redirect_param(mut self, param: impl Into<String>) -> Self {
		self.redirect_param = param.into();

		self
	}

	/// Names the route used when nothing else matches.
	pub fn not_found(mut self, name: impl Into<String>) -> Self {
		self.not_found = Some(name.into());

		self
	}

	/// Sets the starting location (defaults to `/`).
	pub fn initial(mut self, target: NavigationTarget) -> Self {
		self.initial = target;

		self
	}

	/// Validates the table and returns the router.
	pub fn build(self) -> Result<Router, NavigationError> {
		let mut names = std::collections::HashSet::new();

		for route in &self.routes {
			if !route.path.starts_with('/') {
				return Err(NavigationError::InvalidRoute { path: route.path.clone() });
			}
			if !names.insert(route.name.as_str()) {
				return Err(NavigationError::DuplicateRoute { name: route.name.clone() });
			}
		}

		let lookup = |path: &str| self.routes.iter().find(|route| route.capture(path).is_some());

		match lookup(&self.login_route) {
			Some(route) if route.access == RouteAccess::Authenticated =>
				return Err(NavigationError::GuardedLoginRoute { path: self.login_route.clone() }),
			Some(_) => {},
			None => return Err(NavigationError::MissingGuardTarget { path: self.login_route.clone() }),
		}

		if lookup(&self.home_route).is_none() {
			return Err(NavigationError::MissingGuardTarget { path: self.home_route.clone() });
		}

		Ok(Router {
			routes: self.routes,
			session: self.session,
			login_route: self.login_route,
			home_route: self.home_route,
			redirect_param: self.redirect_param,
			not_found: self.not_found,
			state: RwLock::new(RouterState { current: self.initial, history: Vec::new() }),
		})
	}
}
