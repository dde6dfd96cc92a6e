//! Lightweight in-memory access control list (ACL) engine with role inheritance, wildcard rules
//! and predicate guarded access.
//!
//! In general an application can utilize an ACL to allow or deny access to resources by
//! requesting roles.
//!
//! In the sense of this implementation:
//! * a *role* is a named actor category that may request access to a resource.
//! * a *resource* is a named object to which access is controlled.
//! * an *access* is a named operation which may be granted on a resource to a role.
//!
//! Roles, resources and the access names of a resource must be declared before rules can refer to
//! them. Queries never fail: whatever is not answered by a rule is answered by the engine wide
//! default action.
//!
//! # Denied by default
//!
//! Until a developer specifies an "allow" rule, the `Acl` denies every access upon every resource
//! by every role. The fallback is configurable:
//!
//! ```rust
//! use warden_acl::{Access, Acl};
//!
//! let mut acl = Acl::new();
//!
//! assert_eq!(acl.get_default_action(), Access::Deny);
//! assert!(!acl.is_allowed("strangers", "articles", "read", None));
//!
//! acl.set_default_action(Access::Allow);
//! assert!(acl.is_allowed("strangers", "articles", "read", None));
//! ```
//!
//! The default action also answers queries for roles that were never registered, no matter what
//! rules exist for other roles.
//!
//! # Registering roles
//!
//! A role may inherit from one or more previously registered roles, so rule sets can be layered
//! from the general to the specific. The inheritance graph is flattened at the moment an edge is
//! declared: the already flattened list of the inherited role is merged into the heir first, then
//! the direct edge is appended. Ancestors therefore appear in the flattened list before the roles
//! that carried them in:
//!
//! ```rust
//! use warden_acl::Acl;
//!
//! # fn main() -> Result<(), warden_acl::Error> {
//! let mut acl = Acl::new();
//!
//! acl.add_role("guests", &[])?;
//! acl.add_role("staff", &["guests"])?;
//! acl.add_role("editors", &["staff"])?;
//!
//! assert_eq!(acl.get_role_inherits("editors")?, vec!["guests", "staff"]);
//! # Ok(())
//! # }
//! ```
//!
//! Because flattening happens at declaration time, edges added to a parent afterwards do not
//! propagate to roles that inherited from it earlier. A role can never inherit from itself;
//! declaring such an edge is silently rejected.
//!
//! When several inherited roles carry a rule for the same queried access, the one appearing last
//! in the flattened list supplies the answer. The wildcard fallback tiers described below stop at
//! the first inherited hit instead.
//!
//! # Registering resources
//!
//! A resource owns the set of access names that rules may refer to. The set can be declared at
//! registration time or extended and shrunk later:
//!
//! ```rust
//! use warden_acl::Acl;
//!
//! # fn main() -> Result<(), warden_acl::Error> {
//! let mut acl = Acl::new();
//!
//! acl.add_resource("articles", &["read", "edit"])?;
//! acl.add_resource_access("articles", &["publish"])?;
//! acl.drop_resource_access("articles", &["publish"]);
//! # Ok(())
//! # }
//! ```
//!
//! Registering a name twice is a no-op for the name itself, the access lists of both calls are
//! merged.
//!
//! # Defining rules
//!
//! Rules are defined with `allow` and `deny` and stored per `(role, resource, access)` triple.
//! A later definition for the same triple replaces the earlier one. The token `"*"` acts as a
//! wildcard:
//!
//! * as the access, the rule answers any access on the resource,
//! * as the resource (together with the wildcard access), the rule answers any access on any
//!   resource,
//! * as the role, the call expands to one rule per role registered **at the time of the call**.
//!   Roles registered afterwards are not covered.
//!
//! ```rust
//! use warden_acl::Acl;
//!
//! # fn main() -> Result<(), warden_acl::Error> {
//! let mut acl = Acl::new();
//!
//! acl.add_role("admins", &[])?;
//! acl.add_role("auditors", &[])?;
//! acl.add_resource("reports", &["view", "export"])?;
//!
//! // admins may do anything anywhere
//! acl.allow("admins", "*", &["*"], None)?;
//! assert!(acl.is_allowed("admins", "reports", "export", None));
//!
//! // every role registered so far may view reports
//! acl.allow("*", "reports", &["view"], None)?;
//! assert!(acl.is_allowed("auditors", "reports", "view", None));
//! # Ok(())
//! # }
//! ```
//!
//! # Querying
//!
//! Queries walk from the most specific rule to the least specific one and stop at the first tier
//! that holds an answer: the exact triple for the role itself, the exact triple for an inherited
//! role, the wildcard access on the resource, and finally the wildcard resource. Only when every
//! tier comes up empty the default action answers:
//!
//! ```rust
//! use warden_acl::Acl;
//!
//! # fn main() -> Result<(), warden_acl::Error> {
//! let mut acl = Acl::new();
//!
//! acl.add_role("guests", &[])?;
//! acl.add_role("users", &["guests"])?;
//! acl.add_resource("articles", &["read", "edit"])?;
//!
//! acl.allow("guests", "articles", &["read"], None)?;
//! acl.deny("guests", "articles", &["edit"], None)?;
//! acl.allow("users", "articles", &["edit"], None)?;
//!
//! assert!( acl.is_allowed("guests", "articles", "read", None));
//! assert!(!acl.is_allowed("guests", "articles", "edit", None));
//!
//! // users inherit the read rule from guests
//! assert!( acl.is_allowed("users", "articles", "read", None));
//!
//! // the exact rule for users overrides the deny inherited from guests
//! assert!( acl.is_allowed("users", "articles", "edit", None));
//! # Ok(())
//! # }
//! ```
//!
//! # Guarded rules
//!
//! A rule may carry a predicate, a callback receiving the queried role name, the queried resource
//! name and the parameters map supplied by the caller. The predicate verdict is combined with an
//! allow rule; a deny rule stands on its own and never invokes its predicate:
//!
//! ```rust
//! use warden_acl::{Acl, Params, Predicate};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), warden_acl::Error> {
//! let mut acl = Acl::new();
//!
//! acl.add_role("users", &[])?;
//! acl.add_resource("articles", &["edit"])?;
//!
//! // users may only edit their own articles
//! acl.allow("users", "articles", &["edit"], Some(Predicate::new(|_role, _resource, params| {
//!     params
//!         .and_then(|map| map.get("owner"))
//!         .and_then(|value| value.as_bool())
//!         .unwrap_or(false)
//! })))?;
//!
//! let mut own = Params::new();
//!
//! own.insert(String::from("owner"), json!(true));
//! assert!( acl.is_allowed("users", "articles", "edit", Some(&own)));
//! assert!(!acl.is_allowed("users", "articles", "edit", None));
//! # Ok(())
//! # }
//! ```
//!
//! A predicate built with `Predicate::requiring_params` declares that it cannot decide without
//! caller supplied parameters. When such a rule is reached by a query without parameters, the
//! separately configurable no-arguments default action substitutes for the predicate verdict.
//!
//! # Watching queries
//!
//! An observer can be attached to see every query before and after it is evaluated, e.g. for
//! audit logging. Returning `false` from the before hook vetoes the query and denies access
//! without consulting any rule:
//!
//! ```rust
//! use warden_acl::{AccessObserver, Acl};
//!
//! struct Audit;
//!
//! impl AccessObserver for Audit {
//!     fn after_check_access(&self, role: &str, resource: &str, access: &str, allowed: bool) {
//!         println!("{} requested {} on {}: {}", role, access, resource, allowed);
//!     }
//! }
//!
//! let mut acl = Acl::new();
//!
//! acl.set_observer(Box::new(Audit));
//! ```
//!
//! # Sharing between threads
//!
//! The `Acl` itself performs no locking. All registration methods take `&mut self` and all query
//! methods take `&self`, so the natural discipline is to build the complete rule table up front
//! and then share the engine freely between threads for concurrent queries. For rule updates at
//! runtime, wrap the engine in a reader-writer lock.
//!
//! # What is missing?
//!
//! * Removing rules. This will be implemented in a future version by a `revoke` method.

use log::{trace, warn};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;


// Helper types ///////////////////////////////////////////////////////////////////////////////////


/// The wildcard token matching any role, resource or access.
const ANY: &str = "*";

/// Allow or deny access.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Allow,
    Deny
} // enum Access

/// Free-form parameters handed through to rule predicates.
pub type Params = Map<String, Value>;


// Role & Resource ////////////////////////////////////////////////////////////////////////////////


/// A named actor category that may request access to resources.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Role {
    name:        String,
    description: Option<String>,
} // struct Role

impl Role {

    pub fn new(name: &str, description: Option<&str>) -> Self {
        Role{name: String::from(name), description: description.map(String::from)}
    } // new

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    } // name

    #[inline]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    } // description

} // impl Role

impl From<&str> for Role {

    fn from(name: &str) -> Self {
        Role::new(name, None)
    } // from

} // impl From<&str> for Role

impl From<String> for Role {

    fn from(name: String) -> Self {
        Role{name, description: None}
    } // from

} // impl From<String> for Role

/// A named object to which access is controlled.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Resource {
    name:        String,
    description: Option<String>,
} // struct Resource

impl Resource {

    pub fn new(name: &str, description: Option<&str>) -> Self {
        Resource{name: String::from(name), description: description.map(String::from)}
    } // new

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    } // name

    #[inline]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    } // description

} // impl Resource

impl From<&str> for Resource {

    fn from(name: &str) -> Self {
        Resource::new(name, None)
    } // from

} // impl From<&str> for Resource

impl From<String> for Resource {

    fn from(name: String) -> Self {
        Resource{name, description: None}
    } // from

} // impl From<String> for Resource

/// Anything carrying a role name. Queries accept bare names as well as registered `Role` values
/// or application types implementing this trait.
pub trait RoleAware {
    fn role_name(&self) -> &str;
} // trait RoleAware

impl RoleAware for Role {

    fn role_name(&self) -> &str {
        &self.name
    } // role_name

} // impl RoleAware for Role

impl RoleAware for str {

    fn role_name(&self) -> &str {
        self
    } // role_name

} // impl RoleAware for str

impl RoleAware for String {

    fn role_name(&self) -> &str {
        self
    } // role_name

} // impl RoleAware for String

/// Anything carrying a resource name, the counterpart to `RoleAware`.
pub trait ResourceAware {
    fn resource_name(&self) -> &str;
} // trait ResourceAware

impl ResourceAware for Resource {

    fn resource_name(&self) -> &str {
        &self.name
    } // resource_name

} // impl ResourceAware for Resource

impl ResourceAware for str {

    fn resource_name(&self) -> &str {
        self
    } // resource_name

} // impl ResourceAware for str

impl ResourceAware for String {

    fn resource_name(&self) -> &str {
        self
    } // resource_name

} // impl ResourceAware for String


// Predicate //////////////////////////////////////////////////////////////////////////////////////


/// A boolean callback attached to a rule. The callback receives the queried role name, the
/// queried resource name and the parameters map supplied by the caller; its verdict is combined
/// with an allow rule. Deny rules never invoke their predicate.
#[derive(Clone)]
pub struct Predicate {
    func:         Arc<dyn Fn(&str, &str, Option<&Params>) -> bool + Send + Sync>,
    needs_params: bool,
} // struct Predicate

impl Predicate {

    /// Wraps a callback into a predicate.
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&str, &str, Option<&Params>) -> bool + Send + Sync + 'static,
    {
        Predicate{func: Arc::new(func), needs_params: false}
    } // new

    /// Wraps a callback that cannot decide without caller supplied parameters. Queries reaching
    /// such a rule without parameters are answered by the no-arguments default action instead of
    /// the callback.
    pub fn requiring_params<F>(func: F) -> Self
    where
        F: Fn(&str, &str, Option<&Params>) -> bool + Send + Sync + 'static,
    {
        Predicate{func: Arc::new(func), needs_params: true}
    } // requiring_params

    #[inline]
    fn check(&self, role: &str, resource: &str, params: Option<&Params>) -> bool {
        (self.func)(role, resource, params)
    } // check

    #[inline]
    fn requires_params(&self) -> bool {
        self.needs_params
    } // requires_params

} // impl Predicate

impl fmt::Debug for Predicate {

    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        f.write_str(if self.needs_params { "Predicate(requiring params)" } else { "Predicate" })
    } // fmt

} // impl fmt::Debug for Predicate


// Observer ///////////////////////////////////////////////////////////////////////////////////////


/// Hooks around every `is_allowed` call, e.g. for audit logging or metrics. Both methods default
/// to doing nothing.
pub trait AccessObserver: Send + Sync {

    /// Called before a query is evaluated. Returning false vetoes the query: access is denied
    /// without consulting any rule.
    fn before_check_access(&self, _role: &str, _resource: &str, _access: &str) -> bool {
        true
    } // before_check_access

    /// Called after a query was evaluated, with the final outcome.
    fn after_check_access(&self, _role: &str, _resource: &str, _access: &str, _allowed: bool) {
    } // after_check_access

} // trait AccessObserver


// Rule key ///////////////////////////////////////////////////////////////////////////////////////


/// Identifies a rule by its (role, resource, access) triple.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
struct RuleKey {
    role:     String,
    resource: String,
    access:   String,
} // struct RuleKey

impl RuleKey {

    fn new(role: &str, resource: &str, access: &str) -> Self {
        RuleKey{
            role:     String::from(role),
            resource: String::from(resource),
            access:   String::from(access),
        } // RuleKey
    } // new

} // impl RuleKey


// Acl ////////////////////////////////////////////////////////////////////////////////////////////


/// Main structure holding the registered roles, resources, access names and rules. Roles,
/// resources and access names are not automatically defined upon rule definition, but must be
/// declared beforehand. Queries not answered by any rule are answered by the default action,
/// which denies access until configured otherwise.
pub struct Acl {
    roles:          BTreeMap<String, Role>,
    role_inherits:  BTreeMap<String, Vec<String>>,
    resources:      BTreeMap<String, Resource>,
    resource_names: HashSet<String>,
    access_list:    HashSet<(String, String)>,
    rules:          HashMap<RuleKey, Access>,
    predicates:     HashMap<RuleKey, Predicate>,
    observer:       Option<Box<dyn AccessObserver>>,

    default_action:              Access,
    no_arguments_default_action: Access,
} // struct Acl

impl Acl {

    /// Creates a new `Acl` with empty registries and both default actions set to deny.
    pub fn new() -> Self {
        trace!("creating new acl");
        let mut acl = Acl{
            roles:          BTreeMap::new(),
            role_inherits:  BTreeMap::new(),
            resources:      BTreeMap::new(),
            resource_names: HashSet::new(),
            access_list:    HashSet::new(),
            rules:          HashMap::new(),
            predicates:     HashMap::new(),
            observer:       None,

            default_action:              Access::Deny,
            no_arguments_default_action: Access::Deny,
        }; // Acl

        // the wildcard is usable as resource and access without prior registration
        acl.resource_names.insert(String::from(ANY));
        acl.access_list.insert((String::from(ANY), String::from(ANY)));
        acl
    } // new

    /// Sets the action answering queries that no rule matches, including queries for roles that
    /// were never registered.
    pub fn set_default_action(&mut self, action: Access) {
        trace!("setting default action to {:?}", action);
        self.default_action = action;
    } // set_default_action

    /// Returns the action answering queries that no rule matches.
    #[inline]
    pub fn get_default_action(&self) -> Access {
        self.default_action
    } // get_default_action

    /// Sets the action substituting for a parameter requiring predicate that is reached by a
    /// query without parameters.
    pub fn set_no_arguments_default_action(&mut self, action: Access) {
        trace!("setting no-arguments default action to {:?}", action);
        self.no_arguments_default_action = action;
    } // set_no_arguments_default_action

    /// Returns the action substituting for a parameter requiring predicate reached without
    /// parameters.
    #[inline]
    pub fn get_no_arguments_default_action(&self) -> Access {
        self.no_arguments_default_action
    } // get_no_arguments_default_action

    /// Attaches an observer receiving every query before and after it is evaluated. A previously
    /// attached observer is replaced.
    pub fn set_observer(&mut self, observer: Box<dyn AccessObserver>) {
        trace!("attaching access observer");
        self.observer = Some(observer);
    } // set_observer

    /// Adds a new role, optionally inheriting the rules of previously registered roles. Returns
    /// false if the name is already registered. Returns an error if a role to inherit from is
    /// unknown.
    pub fn add_role<R: Into<Role>>(&mut self, role: R, inherits: &[&str]) -> Result<bool, Error> {
        let role = role.into();

        trace!("adding role {} with inherits {:?}", role.name(), inherits);
        if self.roles.contains_key(role.name()) {
            warn!("adding duplicate role: {}", role.name());
            return Ok(false);
        } // if

        let name = String::from(role.name());

        self.roles.insert(name.clone(), role);
        for inherit in inherits {
            self.add_inherit(&name, inherit)?;
        } // for
        Ok(true)
    } // add_role

    /// Declares that `role_name` inherits the rules of `role_to_inherit`. The already flattened
    /// inherit list of `role_to_inherit` is merged into `role_name` first, so the list stays flat
    /// without any lookup at query time. Returns false for a self edge, which is rejected without
    /// altering the list. Returns an error if either role is unknown.
    pub fn add_inherit(&mut self, role_name: &str, role_to_inherit: &str) -> Result<bool, Error> {
        trace!("adding inherit {} to role {}", role_to_inherit, role_name);
        if !self.roles.contains_key(role_name) {
            warn!("missing role while adding inherit: {}", role_name);
            return Err(Error::MissingRole(String::from(role_name)));
        } // if

        // an edge that is already present is left untouched
        if let Some(inherits) = self.role_inherits.get(role_name) {
            if inherits.iter().any(|name| name == role_to_inherit) {
                return Ok(true);
            } // if
        } // if let

        // merge the flattened ancestry of the inherited role before the direct edge, keeping the
        // list of role_name flat at all times
        if let Some(ancestors) = self.role_inherits.get(role_to_inherit).cloned() {
            for ancestor in ancestors {
                self.add_inherit(role_name, &ancestor)?;
            } // for
        } // if let

        if !self.roles.contains_key(role_to_inherit) {
            warn!("missing role to inherit from: {}", role_to_inherit);
            return Err(Error::MissingRole(String::from(role_to_inherit)));
        } // if
        if role_name == role_to_inherit {
            return Ok(false);
        } // if

        self.role_inherits
            .entry(String::from(role_name))
            .or_insert_with(Vec::new)
            .push(String::from(role_to_inherit));
        Ok(true)
    } // add_inherit

    /// Returns true if the role is registered.
    #[inline]
    pub fn is_role(&self, name: &str) -> bool {
        self.roles.contains_key(name)
    } // is_role

    /// Returns the flattened inherit list of the role in declaration order. Returns an error if
    /// the role is unknown.
    pub fn get_role_inherits(&self, name: &str) -> Result<Vec<&str>, Error> {
        trace!("getting inherits of role: {}", name);
        if !self.roles.contains_key(name) {
            warn!("missing role while getting inherits: {}", name);
            return Err(Error::MissingRole(String::from(name)));
        } // if
        match self.role_inherits.get(name) {
            Some(inherits) => Ok(inherits.iter().map(String::as_str).collect()),
            None           => Ok(vec![]),
        } // match
    } // get_role_inherits

    /// Returns the registered roles.
    pub fn get_roles(&self) -> Vec<&Role> {
        self.roles.values().collect()
    } // get_roles

    /// Adds a new resource together with its access names. Registering an existing name again is
    /// a no-op for the name itself, the access names of both calls are merged.
    pub fn add_resource<R: Into<Resource>>(&mut self, resource: R, access: &[&str]) -> Result<bool, Error> {
        let resource = resource.into();
        let name     = String::from(resource.name());

        trace!("adding resource {} with access {:?}", name, access);
        if !self.resource_names.contains(&name) {
            self.resource_names.insert(name.clone());
            self.resources.insert(name.clone(), resource);
        } // if
        if !access.is_empty() {
            self.add_resource_access(&name, access)?;
        } // if
        Ok(true)
    } // add_resource

    /// Declares access names on a registered resource. Duplicate names are merged. Returns an
    /// error if the resource is unknown.
    pub fn add_resource_access(&mut self, resource_name: &str, access: &[&str]) -> Result<bool, Error> {
        trace!("adding access {:?} to resource {}", access, resource_name);
        if !self.resource_names.contains(resource_name) {
            warn!("missing resource while adding access: {}", resource_name);
            return Err(Error::MissingResource(String::from(resource_name)));
        } // if
        for name in access {
            self.access_list.insert((String::from(resource_name), String::from(*name)));
        } // for
        Ok(true)
    } // add_resource_access

    /// Removes access names from a resource. Unknown names and resources are ignored.
    pub fn drop_resource_access(&mut self, resource_name: &str, access: &[&str]) {
        trace!("dropping access {:?} from resource {}", access, resource_name);
        for name in access {
            self.access_list.remove(&(String::from(resource_name), String::from(*name)));
        } // for
    } // drop_resource_access

    /// Returns true if the resource is registered. The wildcard counts as registered.
    #[inline]
    pub fn is_resource(&self, name: &str) -> bool {
        self.resource_names.contains(name)
    } // is_resource

    /// Returns the registered resources.
    pub fn get_resources(&self) -> Vec<&Resource> {
        self.resources.values().collect()
    } // get_resources

    /// Allows the listed access names for the role on the resource, optionally guarded by a
    /// predicate. See `deny` for the shared semantics of rule definition.
    #[inline]
    pub fn allow(&mut self, role: &str, resource: &str, access: &[&str], predicate: Option<Predicate>) -> Result<(), Error> {
        self.set_rule(role, resource, access, Access::Allow, predicate)
    } // allow

    /// Denies the listed access names for the role on the resource. Role and resource must be
    /// registered, and every access name other than the wildcard must be declared on the
    /// resource. The role `"*"` expands to one rule per role registered at the time of the call.
    #[inline]
    pub fn deny(&mut self, role: &str, resource: &str, access: &[&str], predicate: Option<Predicate>) -> Result<(), Error> {
        self.set_rule(role, resource, access, Access::Deny, predicate)
    } // deny

    fn set_rule(&mut self, role: &str, resource: &str, access: &[&str], action: Access, predicate: Option<Predicate>) -> Result<(), Error> {
        trace!("setting {:?} rule for {} on {} to {:?}", action, role, resource, access);
        if role == ANY {
            // expand over the roles known right now, roles registered later are not covered
            let names: Vec<String> = self.roles.keys().cloned().collect();

            for name in names {
                self.insert_rules(&name, resource, access, action, predicate.as_ref())?;
            } // for
            return Ok(());
        } // if
        self.insert_rules(role, resource, access, action, predicate.as_ref())
    } // set_rule

    fn insert_rules(&mut self, role: &str, resource: &str, access: &[&str], action: Access, predicate: Option<&Predicate>) -> Result<(), Error> {
        if !self.roles.contains_key(role) {
            warn!("missing role while setting rule: {}", role);
            return Err(Error::MissingRole(String::from(role)));
        } // if
        if !self.resource_names.contains(resource) {
            warn!("missing resource while setting rule: {}", resource);
            return Err(Error::MissingResource(String::from(resource)));
        } // if

        // validate the whole access list before the first rule is written, a rejected member
        // must not leave the leading members behind as rules
        for name in access {
            if *name != ANY && !self.access_list.contains(&(String::from(resource), String::from(*name))) {
                warn!("missing access while setting rule: {} on {}", name, resource);
                return Err(Error::MissingAccess(String::from(*name), String::from(resource)));
            } // if
        } // for

        for name in access {
            let key = RuleKey::new(role, resource, name);

            if let Some(predicate) = predicate {
                self.predicates.insert(key.clone(), predicate.clone());
            } // if let
            self.rules.insert(key, action);
        } // for
        Ok(())
    } // insert_rules

    /// Returns true if the access is granted to the role on the resource. `role` and `resource`
    /// accept bare names as well as values implementing `RoleAware`/`ResourceAware`. The
    /// parameters map is handed through to the predicate of the matched rule, if any.
    pub fn is_allowed<R, S>(&self, role: &R, resource: &S, access: &str, params: Option<&Params>) -> bool
    where
        R: RoleAware + ?Sized,
        S: ResourceAware + ?Sized,
    {
        let role_name     = role.role_name();
        let resource_name = resource.resource_name();

        trace!("checking access {} for {} on {}", access, role_name, resource_name);
        if let Some(observer) = &self.observer {
            if !observer.before_check_access(role_name, resource_name, access) {
                trace!("    query vetoed by observer");
                return false;
            } // if
        } // if let

        let allowed = self.resolve(role_name, resource_name, access, params);

        if let Some(observer) = &self.observer {
            observer.after_check_access(role_name, resource_name, access, allowed);
        } // if let
        allowed
    } // is_allowed

    #[inline]
    fn probe(&self, role: &str, resource: &str, access: &str) -> Option<(Access, Option<&Predicate>)> {
        trace!("    probing rule for {} on {} to {}", role, resource, access);
        let key    = RuleKey::new(role, resource, access);
        let action = self.rules.get(&key)?;

        Some((*action, self.predicates.get(&key)))
    } // probe

    /// Walks the precedence tiers and combines the found rule with its predicate.
    ///
    /// # Precedence
    ///
    /// The exact triple for the role itself is probed first, then the exact triple for every
    /// inherited role. This inherited scan does not stop at a hit: when several inherited roles
    /// carry a rule for the queried access, the last one in list order wins. The two wildcard
    /// tiers that follow - any access on the resource, then any access on any resource - probe
    /// the role itself first and stop at the first inherited hit.
    fn resolve(&self, role: &str, resource: &str, access: &str, params: Option<&Params>) -> bool {
        // unregistered roles are answered by the default action alone
        if !self.roles.contains_key(role) {
            trace!("    unknown role, using default action");
            return self.default_action == Access::Allow;
        } // if

        let inherits  = self.role_inherits.get(role);
        let mut found = self.probe(role, resource, access);

        if found.is_none() {
            if let Some(inherits) = inherits {
                for inherited in inherits {
                    if let Some(hit) = self.probe(inherited, resource, access) {
                        // keep scanning, a later inherited role shadows this hit
                        found = Some(hit);
                    } // if let
                } // for
            } // if let
        } // if

        if found.is_none() {
            found = self.probe(role, resource, ANY);
        } // if
        if found.is_none() {
            if let Some(inherits) = inherits {
                for inherited in inherits {
                    if let Some(hit) = self.probe(inherited, resource, ANY) {
                        found = Some(hit);
                        break;
                    } // if let
                } // for
            } // if let
        } // if

        if found.is_none() {
            found = self.probe(role, ANY, ANY);
        } // if
        if found.is_none() {
            if let Some(inherits) = inherits {
                for inherited in inherits {
                    if let Some(hit) = self.probe(inherited, ANY, ANY) {
                        found = Some(hit);
                        break;
                    } // if let
                } // for
            } // if let
        } // if

        let (action, predicate) = match found {
            Some(hit) => hit,
            None      => {
                trace!("    no rule matched, using default action");
                return self.default_action == Access::Allow;
            }, // None
        }; // match

        match predicate {
            None            => action == Access::Allow,
            Some(predicate) => {
                if predicate.requires_params() && params.map_or(true, |map| map.is_empty()) {
                    warn!("no parameters supplied for guarded access {} for {} on {}", access, role, resource);
                    action == Access::Allow && self.no_arguments_default_action == Access::Allow
                } else {
                    // a deny rule stands on its own, its predicate is never invoked
                    action == Access::Allow && predicate.check(role, resource, params)
                } // else
            }, // Some
        } // match
    } // resolve

} // impl Acl

impl fmt::Debug for Acl {

    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::result::Result<(), std::fmt::Error> {
        self.rules.fmt(f)
    } // fmt

} // impl fmt::Debug for Acl


// Error //////////////////////////////////////////////////////////////////////////////////////////


#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Error {
    MissingRole(String),
    MissingResource(String),
    /// The access name and the resource it was expected on.
    MissingAccess(String, String),
} // enum Error

impl fmt::Display for Error {

    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match self {
            Error::MissingRole(s) =>
                write!(f, "Missing role: {}", s),
            Error::MissingResource(s) =>
                write!(f, "Missing resource: {}", s),
            Error::MissingAccess(access, resource) =>
                write!(f, "Missing access: {} on resource {}", access, resource),
        } // match
    } // fmt

} // impl fmt::Display for Error


// Tests //////////////////////////////////////////////////////////////////////////////////////////


#[cfg(test)]
mod tests {

    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use test_env_log::test;

    fn setup_acl() -> Acl {
        let mut acl = Acl::new();

        assert!(acl.add_role("guests", &[]).unwrap());
        assert!(acl.add_role("users", &["guests"]).unwrap());
        assert!(acl.add_resource("articles", &["read", "edit"]).unwrap());

        assert!(acl.allow("guests", "articles", &["read"], None).is_ok());
        assert!(acl.deny("guests", "articles", &["edit"], None).is_ok());
        assert!(acl.allow("users", "articles", &["edit"], None).is_ok());

        acl
    } // setup_acl

    #[test]
    fn roles() {
        let mut acl = Acl::new();

        assert_eq!(acl.add_role("guests", &[]), Ok(true));
        assert_eq!(acl.add_role("users", &["guests"]), Ok(true));
        assert!(acl.is_role("guests"));
        assert!(acl.is_role("users"));
        assert!(!acl.is_role("admins"));

        // re-registration is rejected without touching the registry
        assert_eq!(acl.add_role("guests", &[]), Ok(false));
        assert_eq!(acl.get_roles().len(), 2);

        // inheriting from an unknown role is an error, the role itself stays registered
        assert_eq!(acl.add_role("editors", &["ghosts"]), Err(Error::MissingRole(String::from("ghosts"))));
        assert!(acl.is_role("editors"));

        let admins = Role::new("admins", Some("may do everything"));

        assert_eq!(acl.add_role(admins, &[]), Ok(true));

        let names: Vec<&str> = acl.get_roles().iter().map(|role| role.name()).collect();

        assert_eq!(names, vec!["admins", "editors", "guests", "users"]);
    } // roles

    #[test]
    fn inherits() {
        let mut acl = Acl::new();

        assert!(acl.add_role("a", &[]).unwrap());
        assert!(acl.add_role("b", &[]).unwrap());
        assert!(acl.add_role("c", &[]).unwrap());

        // unknown roles on either side are errors
        assert_eq!(acl.add_inherit("x", "a"), Err(Error::MissingRole(String::from("x"))));
        assert_eq!(acl.add_inherit("a", "x"), Err(Error::MissingRole(String::from("x"))));

        // a self edge is silently rejected
        assert_eq!(acl.add_inherit("a", "a"), Ok(false));
        assert_eq!(acl.get_role_inherits("a").unwrap(), Vec::<&str>::new());

        // multi level inheritance is flattened when the edge is declared
        assert_eq!(acl.add_inherit("b", "a"), Ok(true));
        assert_eq!(acl.add_inherit("c", "b"), Ok(true));
        assert_eq!(acl.get_role_inherits("c").unwrap(), vec!["a", "b"]);

        // edges added to a parent later do not propagate to earlier heirs
        assert!(acl.add_role("d", &[]).unwrap());
        assert_eq!(acl.add_inherit("b", "d"), Ok(true));
        assert_eq!(acl.get_role_inherits("c").unwrap(), vec!["a", "b"]);

        // duplicate edges are skipped
        assert_eq!(acl.add_inherit("c", "b"), Ok(true));
        assert_eq!(acl.get_role_inherits("c").unwrap(), vec!["a", "b"]);

        assert_eq!(acl.get_role_inherits("x"), Err(Error::MissingRole(String::from("x"))));
    } // inherits

    #[test]
    fn resources() {
        let mut acl = Acl::new();

        assert_eq!(acl.add_resource("articles", &["read", "edit"]), Ok(true));
        assert!(acl.is_resource("articles"));
        assert!(!acl.is_resource("comments"));

        // re-registration is a no-op for the name itself
        assert_eq!(acl.add_resource("articles", &[]), Ok(true));
        assert_eq!(acl.get_resources().len(), 1);

        // access may be declared after registration, but only on known resources
        assert_eq!(acl.add_resource_access("articles", &["publish"]), Ok(true));
        assert_eq!(acl.add_resource_access("comments", &["read"]), Err(Error::MissingResource(String::from("comments"))));

        // dropped access can no longer be referred to by rules
        assert!(acl.add_role("users", &[]).unwrap());
        acl.drop_resource_access("articles", &["publish"]);
        assert_eq!(
            acl.allow("users", "articles", &["publish"], None),
            Err(Error::MissingAccess(String::from("publish"), String::from("articles")))
        );

        // dropping unknown access or resources is not an error
        acl.drop_resource_access("articles", &["bogus"]);
        acl.drop_resource_access("comments", &["bogus"]);
    } // resources

    #[test]
    fn rules() {
        let mut acl = Acl::new();

        assert!(acl.add_role("users", &[]).unwrap());
        assert!(acl.add_resource("articles", &["read", "edit"]).unwrap());

        assert_eq!(
            acl.allow("admins", "articles", &["read"], None),
            Err(Error::MissingRole(String::from("admins")))
        );
        assert_eq!(
            acl.allow("users", "comments", &["read"], None),
            Err(Error::MissingResource(String::from("comments")))
        );
        assert_eq!(
            acl.allow("users", "articles", &["remove"], None),
            Err(Error::MissingAccess(String::from("remove"), String::from("articles")))
        );

        // the wildcard access bypasses the existence check
        assert!(acl.allow("users", "articles", &["*"], None).is_ok());

        // a rejected member must not leave the leading members behind as rules
        assert_eq!(
            acl.deny("users", "articles", &["read", "remove"], None),
            Err(Error::MissingAccess(String::from("remove"), String::from("articles")))
        );
        assert!(acl.is_allowed("users", "articles", "read", None));

        // last write wins
        assert!(acl.allow("users", "articles", &["edit"], None).is_ok());
        assert!( acl.is_allowed("users", "articles", "edit", None));
        assert!(acl.deny("users", "articles", &["edit"], None).is_ok());
        assert!(!acl.is_allowed("users", "articles", "edit", None));
    } // rules

    #[test]
    fn evaluation() {
        let acl = setup_acl();

        // exact matches
        assert!( acl.is_allowed("guests", "articles", "read", None));
        assert!(!acl.is_allowed("guests", "articles", "edit", None));

        // users inherit the read rule from guests
        assert!( acl.is_allowed("users", "articles", "read", None));

        // the exact rule for users overrides the deny inherited from guests
        assert!( acl.is_allowed("users", "articles", "edit", None));

        // unknown roles are answered by the default action alone
        assert!(!acl.is_allowed("admins", "articles", "read", None));
    } // evaluation

    #[test]
    fn precedence() {
        let mut acl = Acl::new();

        assert!(acl.add_role("users", &[]).unwrap());
        assert!(acl.add_resource("articles", &["read", "edit"]).unwrap());

        // an exact rule shadows the wildcard access rule with the opposite action
        assert!(acl.allow("users", "articles", &["*"], None).is_ok());
        assert!(acl.deny("users", "articles", &["edit"], None).is_ok());
        assert!( acl.is_allowed("users", "articles", "read", None));
        assert!(!acl.is_allowed("users", "articles", "edit", None));

        // the wildcard resource tier answers for resources without own rules
        assert!(acl.add_resource("comments", &["post"]).unwrap());
        assert!(acl.allow("users", "*", &["*"], None).is_ok());
        assert!(acl.is_allowed("users", "comments", "post", None));
    } // precedence

    #[test]
    fn inherited_precedence() {
        let mut acl = Acl::new();

        assert!(acl.add_role("first", &[]).unwrap());
        assert!(acl.add_role("second", &[]).unwrap());
        assert!(acl.add_role("child", &["first", "second"]).unwrap());
        assert!(acl.add_resource("articles", &["read", "edit"]).unwrap());

        // for exact access rules the last inherited hit wins
        assert!(acl.allow("first", "articles", &["read"], None).is_ok());
        assert!(acl.deny("second", "articles", &["read"], None).is_ok());
        assert!(!acl.is_allowed("child", "articles", "read", None));

        // for wildcard access rules the first inherited hit wins
        assert!(acl.deny("first", "articles", &["*"], None).is_ok());
        assert!(acl.allow("second", "articles", &["*"], None).is_ok());
        assert!(!acl.is_allowed("child", "articles", "edit", None));

        // and likewise for the wildcard resource tier
        assert!(acl.add_role("third", &[]).unwrap());
        assert!(acl.add_role("fourth", &[]).unwrap());
        assert!(acl.add_role("heir", &["third", "fourth"]).unwrap());
        assert!(acl.deny("third", "*", &["*"], None).is_ok());
        assert!(acl.allow("fourth", "*", &["*"], None).is_ok());
        assert!(!acl.is_allowed("heir", "articles", "read", None));
    } // inherited_precedence

    #[test]
    fn wildcard_role() {
        let mut acl = Acl::new();

        assert!(acl.add_role("guests", &[]).unwrap());
        assert!(acl.add_role("users", &[]).unwrap());
        assert!(acl.add_resource("articles", &["read"]).unwrap());

        // expands to one rule per role known at the time of the call
        assert!(acl.allow("*", "articles", &["read"], None).is_ok());
        assert!(acl.is_allowed("guests", "articles", "read", None));
        assert!(acl.is_allowed("users", "articles", "read", None));

        // roles registered afterwards are not covered
        assert!(acl.add_role("latecomers", &[]).unwrap());
        assert!(!acl.is_allowed("latecomers", "articles", "read", None));
    } // wildcard_role

    #[test]
    fn default_actions() {
        let mut acl = setup_acl();

        assert_eq!(acl.get_default_action(), Access::Deny);
        assert!(!acl.is_allowed("strangers", "articles", "read", None));

        // unregistered roles get the fallback no matter what rules exist
        acl.set_default_action(Access::Allow);
        assert_eq!(acl.get_default_action(), Access::Allow);
        assert!(acl.is_allowed("strangers", "articles", "read", None));

        // registered roles without a matching rule get the fallback too
        assert!(acl.add_role("readers", &[]).unwrap());
        assert!(acl.is_allowed("readers", "articles", "edit", None));
        acl.set_default_action(Access::Deny);
        assert!(!acl.is_allowed("readers", "articles", "edit", None));
    } // default_actions

    #[test]
    fn predicates() {
        let mut acl = Acl::new();

        assert!(acl.add_role("users", &[]).unwrap());
        assert!(acl.add_resource("articles", &["edit", "remove"]).unwrap());

        // the predicate verdict is combined with an allow rule
        assert!(acl.allow("users", "articles", &["edit"], Some(Predicate::new(|_, _, params| {
            params
                .and_then(|map| map.get("owner"))
                .and_then(|value| value.as_bool())
                .unwrap_or(false)
        }))).is_ok());

        let mut own     = Params::new();
        let mut foreign = Params::new();

        own.insert(String::from("owner"), json!(true));
        foreign.insert(String::from("owner"), json!(false));

        assert!( acl.is_allowed("users", "articles", "edit", Some(&own)));
        assert!(!acl.is_allowed("users", "articles", "edit", Some(&foreign)));
        assert!(!acl.is_allowed("users", "articles", "edit", None));

        // a deny rule never invokes its predicate
        let invoked = Arc::new(AtomicBool::new(false));
        let flag    = invoked.clone();

        assert!(acl.deny("users", "articles", &["remove"], Some(Predicate::new(move |_, _, _| {
            flag.store(true, Ordering::SeqCst);
            true
        }))).is_ok());
        assert!(!acl.is_allowed("users", "articles", "remove", Some(&own)));
        assert!(!invoked.load(Ordering::SeqCst));

        // predicates receive the names of the query, also for wildcard rules
        assert!(acl.allow("users", "*", &["*"], Some(Predicate::new(|role, resource, _| {
            role == "users" && resource == "drafts"
        }))).is_ok());
        assert!( acl.is_allowed("users", "drafts", "read", None));
        assert!(!acl.is_allowed("users", "reviews", "read", None));
    } // predicates

    #[test]
    fn no_arguments_fallback() {
        let mut acl = Acl::new();

        assert!(acl.add_role("users", &[]).unwrap());
        assert!(acl.add_resource("articles", &["edit"]).unwrap());
        assert!(acl.allow("users", "articles", &["edit"], Some(Predicate::requiring_params(|_, _, params| {
            params
                .and_then(|map| map.get("owner"))
                .and_then(|value| value.as_bool())
                .unwrap_or(false)
        }))).is_ok());

        // without parameters the separate fallback substitutes for the predicate verdict
        assert_eq!(acl.get_no_arguments_default_action(), Access::Deny);
        assert!(!acl.is_allowed("users", "articles", "edit", None));

        acl.set_no_arguments_default_action(Access::Allow);
        assert!(acl.is_allowed("users", "articles", "edit", None));

        // an empty parameters map counts as missing
        let empty = Params::new();

        assert!(acl.is_allowed("users", "articles", "edit", Some(&empty)));

        // with parameters the predicate decides again
        let mut own     = Params::new();
        let mut foreign = Params::new();

        own.insert(String::from("owner"), json!(true));
        foreign.insert(String::from("owner"), json!(false));

        assert!( acl.is_allowed("users", "articles", "edit", Some(&own)));
        assert!(!acl.is_allowed("users", "articles", "edit", Some(&foreign)));
    } // no_arguments_fallback

    #[test]
    fn rich_values() {
        let mut acl = Acl::new();

        let editors  = Role::new("editors", Some("editorial staff"));
        let articles = Resource::new("articles", Some("published content"));

        assert!(acl.add_role(editors.clone(), &[]).unwrap());
        assert!(acl.add_resource(articles.clone(), &["edit"]).unwrap());
        assert!(acl.allow("editors", "articles", &["edit"], None).is_ok());

        // queries accept the registered values as well as bare names
        assert!(acl.is_allowed(&editors, &articles, "edit", None));
        assert!(acl.is_allowed("editors", "articles", "edit", None));

        assert_eq!(acl.get_roles(), vec![&Role::new("editors", Some("editorial staff"))]);
        assert_eq!(acl.get_resources(), vec![&Resource::new("articles", Some("published content"))]);
        assert_eq!(editors.description(), Some("editorial staff"));
    } // rich_values

    struct Recorder {
        veto: Arc<AtomicBool>,
        seen: Arc<AtomicUsize>,
        last: Arc<AtomicBool>,
    } // struct Recorder

    impl AccessObserver for Recorder {

        fn before_check_access(&self, _role: &str, _resource: &str, _access: &str) -> bool {
            !self.veto.load(Ordering::SeqCst)
        } // before_check_access

        fn after_check_access(&self, _role: &str, _resource: &str, _access: &str, allowed: bool) {
            self.seen.fetch_add(1, Ordering::SeqCst);
            self.last.store(allowed, Ordering::SeqCst);
        } // after_check_access

    } // impl AccessObserver for Recorder

    #[test]
    fn observer() {
        let mut acl = setup_acl();

        let veto = Arc::new(AtomicBool::new(false));
        let seen = Arc::new(AtomicUsize::new(0));
        let last = Arc::new(AtomicBool::new(false));

        acl.set_observer(Box::new(Recorder{
            veto: veto.clone(),
            seen: seen.clone(),
            last: last.clone(),
        }));

        // the outcome is reported after every query
        assert!(acl.is_allowed("guests", "articles", "read", None));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert!(last.load(Ordering::SeqCst));

        assert!(!acl.is_allowed("guests", "articles", "edit", None));
        assert_eq!(seen.load(Ordering::SeqCst), 2);
        assert!(!last.load(Ordering::SeqCst));

        // a veto denies the query before any rule is examined
        veto.store(true, Ordering::SeqCst);
        assert!(!acl.is_allowed("guests", "articles", "read", None));
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    } // observer

} // mod tests
