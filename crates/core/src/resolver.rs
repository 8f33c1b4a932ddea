//! Graph resolution.
//!
//! Resolution is a pure function of the discovered pool plus the
//! caller's roots and picks. It runs in two phases. The propagation
//! phase computes a resolution outcome for every demanded type key,
//! re-evaluating keys whose weak candidates get redeemed by `require=`
//! edges, picks or roots, until a fixpoint is reached. The assembly
//! phase then walks outward from the roots over the final outcomes,
//! retains exactly the reachable nodes, filters middleware by the labels
//! of the retained APIs and records missing dependencies per consumer.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use weft_model::{Pos, TypeRef, Workspace};

use crate::directive::DirectiveParser;
use crate::discovery::{discover, Pool};
use crate::errors::Error;
use crate::graph::Graph;
use crate::node::{Config, NodeKey, Provider};
use crate::wellknown;

/// Caller-supplied resolution inputs.
#[derive(Debug, Clone)]
pub struct Options {
    /// Canonical type keys the graph must produce.
    pub roots: Vec<String>,
    /// Fully-qualified provider names chosen to settle multi-candidate
    /// types.
    pub picks: Vec<String>,
    /// Directive prefix token.
    pub directive_prefix: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            picks: Vec::new(),
            directive_prefix: crate::directive::DEFAULT_PREFIX.to_string(),
        }
    }
}

/// Discover and resolve in one step.
pub fn analyze(ws: &Workspace, options: &Options) -> Result<Graph, Error> {
    let parser = DirectiveParser::new(&options.directive_prefix);
    let pool = discover(ws, &parser)?;
    resolve(ws, pool, options)
}

/// Resolve a discovered pool against the caller's roots and picks.
pub fn resolve(ws: &Workspace, pool: Pool, options: &Options) -> Result<Graph, Error> {
    Resolver::new(ws, pool, options)?.run()
}

/// Resolution outcome for one demanded type key.
#[derive(Debug, Clone, PartialEq)]
enum Outcome {
    Config(Config),
    Single(Provider),
    /// The key is collection-valued; membership is derived from the
    /// candidate set and the redeemed weak providers.
    Multi(Vec<Provider>),
    Ambiguous(Pos, Vec<String>),
    Unresolved,
}

#[derive(Debug, Clone)]
enum Work {
    Type(TypeRef),
    Require {
        target: NodeKey,
        origin: NodeKey,
        pos: Pos,
    },
}

/// Assembly demand: a type needed by a consumer, or a `require=` target.
#[derive(Debug, Clone)]
enum Demand {
    Type(TypeRef, Option<NodeKey>),
    Require(NodeKey),
}

/// Accumulator of the assembly walk.
#[derive(Debug, Default)]
struct Retained {
    visited: BTreeSet<String>,
    singles: BTreeMap<String, Provider>,
    extras: BTreeMap<String, Provider>,
    multis: BTreeMap<String, Vec<Provider>>,
    configs: BTreeMap<String, Config>,
    missing: BTreeMap<String, BTreeSet<String>>,
    ambiguous: Vec<(Pos, String, Vec<String>)>,
}

fn enqueue_reach(queue: &mut VecDeque<Demand>, provider: &Provider) {
    for param in &provider.params {
        queue.push_back(Demand::Type(param.clone(), Some(provider.key.clone())));
    }
    for target in &provider.require {
        queue.push_back(Demand::Require(target.clone()));
    }
}

struct Resolver<'w> {
    ws: &'w Workspace,
    pool: Pool,
    picks: BTreeSet<String>,
    roots: Vec<TypeRef>,
    root_keys: HashSet<String>,
    queue: VecDeque<Work>,
    /// Demanded type key -> the reference it was demanded through.
    demanded: HashMap<String, TypeRef>,
    outcomes: HashMap<String, Outcome>,
    /// Node keys redeemed through `require=` edges.
    require_reached: HashSet<String>,
    /// (type key, node key) pairs whose parameters were already enqueued.
    activated: HashSet<(String, String)>,
    /// Middleware indices whose dependencies were already enqueued.
    seeded_middleware: HashSet<usize>,
}

impl<'w> Resolver<'w> {
    fn new(ws: &'w Workspace, pool: Pool, options: &Options) -> Result<Self, Error> {
        let mut resolver = Resolver {
            ws,
            pool,
            picks: BTreeSet::new(),
            roots: Vec::new(),
            root_keys: HashSet::new(),
            queue: VecDeque::new(),
            demanded: HashMap::new(),
            outcomes: HashMap::new(),
            require_reached: HashSet::new(),
            activated: HashSet::new(),
            seeded_middleware: HashSet::new(),
        };
        resolver.check_consumer_receivers()?;
        resolver.seed_picks(options)?;
        resolver.seed_roots(options)?;
        Ok(resolver)
    }

    /// Handlers on config receivers are rejected before any closure
    /// work; discovery normally catches this but `resolve` accepts
    /// arbitrary pools.
    fn check_consumer_receivers(&self) -> Result<(), Error> {
        let consumers = self
            .pool
            .apis
            .iter()
            .map(|a| (&a.pos, &a.key, &a.receiver))
            .chain(self.pool.crons.iter().map(|c| (&c.pos, &c.key, &c.receiver)))
            .chain(
                self.pool
                    .subscriptions
                    .iter()
                    .map(|s| (&s.pos, &s.key, &s.receiver)),
            );
        for (pos, key, receiver) in consumers {
            if self.pool.config_for(receiver).is_some() {
                return Err(Error::ApiOnConfig {
                    pos: pos.clone(),
                    func: key.0.clone(),
                    type_key: receiver.value_form().key(),
                });
            }
        }
        Ok(())
    }

    fn seed_picks(&mut self, options: &Options) -> Result<(), Error> {
        for pick in &options.picks {
            if self.pool.provider_by_key(pick).is_none() {
                return Err(Error::PickUnknown { name: pick.clone() });
            }
            self.picks.insert(pick.clone());
        }
        Ok(())
    }

    /// True if any current pick selects a provider of `ty`.
    fn picked_for(&self, ty: &TypeRef) -> bool {
        let want = ty.key();
        self.picks.iter().any(|pick| {
            self.pool
                .provider_by_key(pick)
                .is_some_and(|p| {
                    p.provides.key() == want
                        || (p.is_generic() && p.provides.base_name() == ty.base_name())
                })
        })
    }

    fn auto_pick(&mut self, target: &str, ty: &TypeRef) {
        if self.pool.provider_by_key(target).is_some() && !self.picked_for(ty) {
            tracing::debug!(pick = target, "auto-injected pick");
            self.picks.insert(target.to_string());
        }
    }

    fn add_root(&mut self, ty: TypeRef) {
        if self.root_keys.insert(ty.key()) {
            tracing::debug!(root = %ty, "rooted");
            self.queue.push_back(Work::Type(ty.clone()));
            self.roots.push(ty);
        }
    }

    fn seed_roots(&mut self, options: &Options) -> Result<(), Error> {
        for raw in &options.roots {
            let ty = TypeRef::parse(raw).map_err(|_| Error::RootUnknown {
                type_key: raw.clone(),
            })?;
            if !self.producible(&ty) {
                return Err(Error::RootUnknown {
                    type_key: raw.clone(),
                });
            }
            self.add_root(ty);
        }

        // Framework surfaces force their own roots and default picks.
        if !self.pool.apis.is_empty() {
            self.auto_pick(wellknown::SERVER_PROVIDER, &wellknown::server_root());
            self.add_root(wellknown::server_root());
        }
        if !self.pool.crons.is_empty() {
            self.auto_pick(wellknown::SCHEDULER_PROVIDER, &wellknown::scheduler_root());
            self.add_root(wellknown::scheduler_root());
        } else {
            self.auto_pick(
                wellknown::NULL_SCHEDULER_PROVIDER,
                &wellknown::scheduler_root(),
            );
        }
        let events: Vec<TypeRef> = self
            .pool
            .subscriptions
            .iter()
            .map(|s| s.event.clone())
            .collect();
        for event in events {
            self.add_root(wellknown::topic_of(&event));
        }

        // Without explicit roots, every consumer receiver becomes one.
        if options.roots.is_empty() {
            let receivers: Vec<TypeRef> = self
                .pool
                .apis
                .iter()
                .map(|a| a.receiver.clone())
                .chain(self.pool.crons.iter().map(|c| c.receiver.clone()))
                .chain(self.pool.subscriptions.iter().map(|s| s.receiver.clone()))
                .collect();
            for receiver in receivers {
                self.add_root(receiver);
            }
        }
        Ok(())
    }

    /// Anything at all can produce this key: a provider, a config, or a
    /// generic template at its base name.
    fn producible(&self, ty: &TypeRef) -> bool {
        self.pool.providers.contains_key(&ty.key())
            || self.pool.config_for(ty).is_some()
            || (!ty.type_args().is_empty()
                && (self.pool.generic_providers.contains_key(&ty.base_name())
                    || self.pool.generic_configs.contains_key(&ty.base_name())))
    }

    fn run(mut self) -> Result<Graph, Error> {
        loop {
            self.drain()?;
            let mut changed = self.refresh();
            changed |= self.multi_round(false);
            changed |= self.middleware_round();
            if changed || !self.queue.is_empty() {
                continue;
            }
            // Stable; all-weak multi groups nobody redeemed fall back to
            // full membership.
            if self.multi_round(true) {
                continue;
            }
            break;
        }
        self.assemble()
    }

    fn drain(&mut self) -> Result<(), Error> {
        while let Some(work) = self.queue.pop_front() {
            match work {
                Work::Type(ty) => {
                    let key = ty.key();
                    if self.outcomes.contains_key(&key) {
                        continue;
                    }
                    self.demanded.insert(key.clone(), ty.clone());
                    let outcome = self.evaluate(&ty);
                    self.apply(&key, outcome);
                }
                Work::Require { target, origin, pos } => {
                    self.reach_require(&target, &origin, &pos)?;
                }
            }
        }
        Ok(())
    }

    fn reach_require(&mut self, target: &NodeKey, origin: &NodeKey, pos: &Pos) -> Result<(), Error> {
        if !self.require_reached.insert(target.0.clone()) {
            return Ok(());
        }
        let Some(provider) = self.pool.provider_by_key(&target.0).cloned() else {
            return Err(Error::RequireUnknown {
                pos: pos.clone(),
                func: origin.0.clone(),
                target: target.0.clone(),
            });
        };
        tracing::debug!(target = %target, origin = %origin, "require edge reached");
        if provider.is_generic() {
            // A generic template cannot run until it is instantiated by
            // some concrete demand; the reach mark alone redeems it.
            return Ok(());
        }
        // The required provider runs, so its type and inputs join the
        // demand set.
        self.queue.push_back(Work::Type(provider.provides.clone()));
        self.enqueue_provider_inputs(&provider);
        Ok(())
    }

    fn enqueue_provider_inputs(&mut self, provider: &Provider) {
        for param in &provider.params {
            self.queue.push_back(Work::Type(param.clone()));
        }
        for target in &provider.require {
            self.queue.push_back(Work::Require {
                target: target.clone(),
                origin: provider.key.clone(),
                pos: provider.pos.clone(),
            });
        }
    }

    /// Pure selection for one demanded reference, under the current
    /// redemption state.
    fn evaluate(&self, ty: &TypeRef) -> Outcome {
        let key = ty.key();

        // Configs satisfy both value and pointer demands.
        if let Some(cfg) = self.pool.config_for(ty) {
            return Outcome::Config(cfg.clone());
        }
        if !ty.type_args().is_empty() {
            if let Some(template) = self.pool.generic_configs.get(&ty.base_name()) {
                if ty.type_args().len() == template.type_params.len()
                    && weft_model::satisfies(self.ws, ty.type_args(), &template.type_params)
                {
                    let concrete = template.instantiate(ty.type_args());
                    if concrete.ty.value_form().key() == ty.value_form().key() {
                        return Outcome::Config(concrete);
                    }
                }
            }
        }

        if let Some(candidates) = self.pool.providers.get(&key) {
            return self.select(&key, candidates);
        }

        // Generic templates at the base name, instantiated per concrete
        // argument vector.
        if !ty.type_args().is_empty() {
            if let Some(templates) = self.pool.generic_providers.get(&ty.base_name()) {
                let candidates: Vec<Provider> = templates
                    .iter()
                    .filter(|t| t.type_params.len() == ty.type_args().len())
                    .filter(|t| weft_model::satisfies(self.ws, ty.type_args(), &t.type_params))
                    .map(|t| t.instantiate(ty.type_args()))
                    .filter(|c| c.provides.key() == key)
                    .collect();
                if !candidates.is_empty() {
                    return self.select(&key, &candidates);
                }
            }
        }

        Outcome::Unresolved
    }

    fn select(&self, key: &str, candidates: &[Provider]) -> Outcome {
        if candidates.iter().all(|c| c.multi) {
            return Outcome::Multi(candidates.to_vec());
        }

        let non_weak: Vec<&Provider> = candidates.iter().filter(|c| !c.weak).collect();
        if non_weak.len() == 1 {
            return Outcome::Single(non_weak[0].clone());
        }

        let picked: Vec<&Provider> = candidates
            .iter()
            .filter(|c| self.picks.contains(c.key.as_str()))
            .collect();
        if picked.len() == 1 {
            return Outcome::Single(picked[0].clone());
        }

        if non_weak.is_empty() {
            let redeemed: Vec<&Provider> = candidates
                .iter()
                .filter(|c| {
                    self.require_reached.contains(c.key.as_str())
                        || self.picks.contains(c.key.as_str())
                        || self.root_keys.contains(key)
                })
                .collect();
            match redeemed.len() {
                0 => return Outcome::Unresolved,
                1 => return Outcome::Single(redeemed[0].clone()),
                _ => return self.ambiguity(key, &redeemed),
            }
        }
        self.ambiguity(key, &non_weak)
    }

    fn ambiguity(&self, key: &str, candidates: &[&Provider]) -> Outcome {
        let mut sorted: Vec<&&Provider> = candidates.iter().collect();
        sorted.sort_by_key(|p| (p.pos.file.clone(), p.pos.line, p.pos.column));
        let pos = sorted[0].pos.clone();
        let names = sorted.iter().map(|p| p.key.0.clone()).collect();
        tracing::debug!(type_key = key, "ambiguous providers");
        Outcome::Ambiguous(pos, names)
    }

    fn apply(&mut self, key: &str, outcome: Outcome) {
        match &outcome {
            Outcome::Single(provider) => {
                // Instantiations enter the concrete pool exactly once per
                // argument vector so later demands hit them directly.
                if !provider.type_args.is_empty()
                    && !self.pool.providers.contains_key(key)
                {
                    self.pool
                        .providers
                        .insert(key.to_string(), vec![provider.clone()]);
                }
                if self.activated.insert((key.to_string(), provider.key.0.clone())) {
                    self.enqueue_provider_inputs(provider);
                }
            }
            Outcome::Multi(candidates) => {
                if !self.pool.providers.contains_key(key)
                    && candidates.iter().any(|c| !c.type_args.is_empty())
                {
                    self.pool
                        .providers
                        .insert(key.to_string(), candidates.clone());
                }
            }
            Outcome::Config(_) | Outcome::Ambiguous(..) | Outcome::Unresolved => {}
        }
        self.outcomes.insert(key.to_string(), outcome);
    }

    /// Re-evaluate every demanded key against the grown redemption
    /// state; apply anything that changed.
    fn refresh(&mut self) -> bool {
        let mut keys: Vec<String> = self.outcomes.keys().cloned().collect();
        keys.sort();
        let mut changed = false;
        for key in keys {
            let Some(ty) = self.demanded.get(&key).cloned() else {
                continue;
            };
            let next = self.evaluate(&ty);
            if self.outcomes.get(&key) != Some(&next) {
                tracing::debug!(type_key = %key, "resolution changed");
                self.apply(&key, next);
                changed = true;
            }
        }
        changed
    }

    /// Current members of a multi group: every non-weak provider plus
    /// weak ones reached over `require=` edges; if that leaves nothing
    /// and `fallback` is allowed, every candidate.
    fn multi_members(&self, candidates: &[Provider], fallback: bool) -> Vec<Provider> {
        let mut members: Vec<Provider> = candidates
            .iter()
            .filter(|c| !c.weak || self.require_reached.contains(c.key.as_str()))
            .cloned()
            .collect();
        if members.is_empty() && fallback {
            members = candidates.to_vec();
        }
        members.sort_by_key(|p| p.key.clone());
        members
    }

    fn multi_round(&mut self, fallback: bool) -> bool {
        let mut groups: Vec<(String, Vec<Provider>)> = self
            .outcomes
            .iter()
            .filter_map(|(key, outcome)| match outcome {
                Outcome::Multi(cands) => Some((key.clone(), cands.clone())),
                _ => None,
            })
            .collect();
        groups.sort_by(|a, b| a.0.cmp(&b.0));
        let mut changed = false;
        for (key, candidates) in groups {
            for member in self.multi_members(&candidates, fallback) {
                if self.activated.insert((key.clone(), member.key.0.clone())) {
                    self.enqueue_provider_inputs(&member);
                    changed = true;
                }
            }
        }
        changed
    }

    /// Labels referenced by the APIs demanded so far.
    fn referenced_labels(&self) -> BTreeSet<String> {
        self.pool
            .apis
            .iter()
            .filter(|api| self.outcomes.contains_key(&api.receiver.key()))
            .flat_map(|api| api.labels.iter().map(|l| l.name.clone()))
            .collect()
    }

    /// Seed the dependencies of every middleware that survives label
    /// filtering against the current API set.
    fn middleware_round(&mut self) -> bool {
        let labels = self.referenced_labels();
        let mut changed = false;
        for idx in 0..self.pool.middleware.len() {
            if self.seeded_middleware.contains(&idx) {
                continue;
            }
            let mw = &self.pool.middleware[idx];
            let global = mw.labels.is_empty();
            if !global && !mw.labels.iter().any(|l| labels.contains(l)) {
                continue;
            }
            let deps: Vec<TypeRef> = mw.deps.clone();
            self.seeded_middleware.insert(idx);
            for dep in deps {
                self.queue.push_back(Work::Type(dep));
            }
            changed = true;
        }
        changed
    }

    /// Process one demand queue against the final outcomes, retaining
    /// everything reached and attributing unresolved keys to the
    /// consumer that demanded them.
    fn walk(&self, seed: Vec<Demand>, retained: &mut Retained) {
        let mut queue: VecDeque<Demand> = seed.into();
        while let Some(demand) = queue.pop_front() {
            match demand {
                Demand::Type(ty, by) => {
                    let key = ty.key();
                    match self.outcomes.get(&key) {
                        Some(Outcome::Config(cfg)) => {
                            if retained.visited.insert(key) {
                                retained
                                    .configs
                                    .insert(cfg.ty.value_form().key(), cfg.clone());
                            }
                        }
                        Some(Outcome::Single(p)) => {
                            if retained.visited.insert(key.clone()) {
                                retained.singles.insert(key, p.clone());
                                enqueue_reach(&mut queue, p);
                            }
                        }
                        Some(Outcome::Multi(cands)) => {
                            if retained.visited.insert(key.clone()) {
                                let members = self.multi_members(cands, true);
                                for member in &members {
                                    enqueue_reach(&mut queue, member);
                                }
                                retained.multis.insert(key, members);
                            }
                        }
                        Some(Outcome::Ambiguous(pos, names)) => {
                            if retained.visited.insert(key.clone()) {
                                retained.ambiguous.push((pos.clone(), key, names.clone()));
                            }
                        }
                        Some(Outcome::Unresolved) | None => {
                            retained.visited.insert(key.clone());
                            if let Some(by) = by {
                                retained.missing.entry(by.0).or_default().insert(key);
                            }
                        }
                    }
                }
                Demand::Require(target) => {
                    let already = retained.singles.values().any(|p| p.key == target)
                        || retained.extras.contains_key(&target.0)
                        || retained.multis.values().flatten().any(|p| p.key == target);
                    if already {
                        continue;
                    }
                    // Target existence was validated during propagation;
                    // generic templates stay uninstantiated.
                    let Some(provider) = self.pool.provider_by_key(&target.0) else {
                        continue;
                    };
                    if provider.is_generic() {
                        continue;
                    }
                    let provider = provider.clone();
                    retained.extras.insert(target.0.clone(), provider.clone());
                    enqueue_reach(&mut queue, &provider);
                }
            }
        }
    }

    /// Walk outward from the roots over the final outcomes and retain
    /// exactly what is reached.
    fn assemble(self) -> Result<Graph, Error> {
        let mut retained = Retained::default();

        let roots: Vec<Demand> = self
            .roots
            .iter()
            .map(|r| Demand::Type(r.clone(), None))
            .collect();
        self.walk(roots, &mut retained);

        // Consumers survive iff their receiver type was demanded; the
        // retained APIs then decide which middleware stays, and its
        // dependencies join the walk.
        let apis: Vec<_> = self
            .pool
            .apis
            .iter()
            .filter(|a| retained.visited.contains(&a.receiver.key()))
            .cloned()
            .collect();
        let labels: BTreeSet<String> = apis
            .iter()
            .flat_map(|api| api.labels.iter().map(|l| l.name.clone()))
            .collect();
        let middleware: Vec<_> = self
            .pool
            .middleware
            .iter()
            .filter(|mw| {
                mw.labels.is_empty() || mw.labels.iter().any(|l| labels.contains(l))
            })
            .cloned()
            .collect();
        let mw_demands: Vec<Demand> = middleware
            .iter()
            .flat_map(|mw| {
                mw.deps
                    .iter()
                    .map(|d| Demand::Type(d.clone(), Some(mw.key.clone())))
                    .collect::<Vec<_>>()
            })
            .collect();
        self.walk(mw_demands, &mut retained);

        let Retained {
            singles,
            mut extras,
            multis,
            configs,
            mut missing,
            ambiguous,
            visited,
        } = retained;

        if let Some((pos, type_key, candidates)) = ambiguous
            .into_iter()
            .min_by_key(|(pos, key, _)| (pos.file.clone(), pos.line, pos.column, key.clone()))
        {
            return Err(Error::Ambiguous {
                pos,
                type_key,
                candidates,
            });
        }

        // A provider retained through its type resolution does not also
        // appear as a require extra.
        let resolved_keys: HashSet<String> = singles
            .values()
            .chain(multis.values().flatten())
            .map(|p| p.key.0.clone())
            .collect();
        extras.retain(|key, _| !resolved_keys.contains(key));

        let crons: Vec<_> = self
            .pool
            .crons
            .iter()
            .filter(|c| visited.contains(&c.receiver.key()))
            .cloned()
            .collect();
        let subscriptions: Vec<_> = self
            .pool
            .subscriptions
            .iter()
            .filter(|s| visited.contains(&s.receiver.key()))
            .cloned()
            .collect();
        for (key, receiver) in apis
            .iter()
            .map(|a| (&a.key, &a.receiver))
            .chain(crons.iter().map(|c| (&c.key, &c.receiver)))
            .chain(subscriptions.iter().map(|s| (&s.key, &s.receiver)))
        {
            let rk = receiver.key();
            if !singles.contains_key(&rk)
                && !multis.contains_key(&rk)
                && !configs.contains_key(&receiver.value_form().key())
            {
                missing.entry(key.0.clone()).or_default().insert(rk);
            }
        }

        let missing: BTreeMap<String, Vec<String>> = missing
            .into_iter()
            .map(|(k, v)| (k, v.into_iter().collect()))
            .collect();

        tracing::debug!(
            providers = singles.len() + extras.len(),
            multi_groups = multis.len(),
            configs = configs.len(),
            apis = apis.len(),
            middleware = middleware.len(),
            missing = missing.len(),
            "resolution complete"
        );

        Ok(Graph::new(
            singles,
            extras,
            multis,
            configs,
            apis,
            crons,
            subscriptions,
            middleware,
            missing,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_model::{FuncBuilder, PackageBuilder};

    #[test]
    fn test_pick_unknown_is_rejected() {
        let ws = Workspace::new(vec![PackageBuilder::new("app", "app")
            .func(
                FuncBuilder::new("NewDB")
                    .doc("//weft:provider")
                    .result(TypeRef::ptr("app", "DB")),
            )
            .build()]);
        let err = analyze(
            &ws,
            &Options {
                roots: vec!["*app.DB".into()],
                picks: vec!["app.Nope".into()],
                ..Options::default()
            },
        )
        .unwrap_err();
        assert_eq!(
            err,
            Error::PickUnknown {
                name: "app.Nope".into()
            }
        );
    }

    #[test]
    fn test_root_unknown_is_rejected() {
        let ws = Workspace::new(vec![PackageBuilder::new("app", "app").build()]);
        let err = analyze(
            &ws,
            &Options {
                roots: vec!["*app.DB".into()],
                ..Options::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, Error::RootUnknown { .. }));

        let err = analyze(
            &ws,
            &Options {
                roots: vec!["not a key [".into()],
                ..Options::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, Error::RootUnknown { .. }));
    }

    #[test]
    fn test_require_unknown_is_fatal() {
        let ws = Workspace::new(vec![PackageBuilder::new("app", "app")
            .func(
                FuncBuilder::new("NewDB")
                    .doc("//weft:provider require=Ghost")
                    .result(TypeRef::ptr("app", "DB")),
            )
            .build()]);
        let err = analyze(
            &ws,
            &Options {
                roots: vec!["*app.DB".into()],
                ..Options::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, Error::RequireUnknown { .. }));
    }
}
