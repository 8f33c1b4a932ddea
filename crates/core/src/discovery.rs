use std::collections::HashMap;

use weft_model::{FuncDecl, Package, Pos, TypeDecl, TypeKind, TypeRef, Workspace};

use crate::directive::{Directive, DirectiveParser};
use crate::errors::Error;
use crate::node::{
    Api, ApiParam, ApiResult, Config, Cron, Middleware, NodeKey, Provider, Subscription,
};
use crate::wellknown;

/// Everything discovery produced. Providers are multimapped by their
/// provided-type key; single entries become singletons at resolution
/// time. Generic templates are indexed separately under their base name.
#[derive(Debug, Clone, Default)]
pub struct Pool {
    pub providers: HashMap<String, Vec<Provider>>,
    pub generic_providers: HashMap<String, Vec<Provider>>,
    /// Keyed by the value-form type key; lookup consults both `T` and
    /// `*T`.
    pub configs: HashMap<String, Config>,
    pub generic_configs: HashMap<String, Config>,
    pub apis: Vec<Api>,
    pub crons: Vec<Cron>,
    pub subscriptions: Vec<Subscription>,
    pub middleware: Vec<Middleware>,
}

impl Pool {
    /// Find any provider (concrete or generic template) by its
    /// fully-qualified function name.
    pub fn provider_by_key(&self, key: &str) -> Option<&Provider> {
        self.providers
            .values()
            .chain(self.generic_providers.values())
            .flatten()
            .find(|p| p.key.as_str() == key)
    }

    /// Config lookup under pointer/value equivalence.
    pub fn config_for(&self, ty: &TypeRef) -> Option<&Config> {
        self.configs.get(&ty.value_form().key())
    }
}

/// Walk the workspace and build the node pool.
pub fn discover(ws: &Workspace, parser: &DirectiveParser) -> Result<Pool, Error> {
    let mut pool = Pool::default();
    for pkg in ws.packages() {
        for ty in &pkg.types {
            discover_type(pkg, ty, parser, &mut pool)?;
        }
        for func in &pkg.funcs {
            discover_func(ws, pkg, func, parser, &mut pool)?;
        }
    }
    check_config_receivers(&pool)?;
    check_mixed_multi(&pool)?;
    tracing::debug!(
        providers = pool.providers.values().map(Vec::len).sum::<usize>(),
        generics = pool.generic_providers.values().map(Vec::len).sum::<usize>(),
        configs = pool.configs.len() + pool.generic_configs.len(),
        apis = pool.apis.len(),
        crons = pool.crons.len(),
        subscriptions = pool.subscriptions.len(),
        middleware = pool.middleware.len(),
        "discovery complete"
    );
    Ok(pool)
}

/// Extract the declaration's directive, if any, plus its remaining
/// documentation text. More than one directive on a declaration is an
/// error.
fn directive_of(
    doc: &[String],
    pos: &Pos,
    parser: &DirectiveParser,
) -> Result<(Option<Directive>, String), Error> {
    let mut found = None;
    let mut plain = Vec::new();
    for line in doc {
        match parser.parse(line, pos)? {
            Some(directive) => {
                if found.is_some() {
                    return Err(Error::DirectiveInvalid {
                        pos: pos.clone(),
                        reason: "declaration carries more than one directive".to_string(),
                    });
                }
                found = Some(directive);
            }
            None => plain.push(line.trim_start_matches('/').trim().to_string()),
        }
    }
    Ok((found, plain.join("\n").trim().to_string()))
}

fn discover_type(
    pkg: &Package,
    ty: &TypeDecl,
    parser: &DirectiveParser,
    pool: &mut Pool,
) -> Result<(), Error> {
    let (directive, _) = directive_of(&ty.doc, &ty.pos, parser)?;
    let Some(directive) = directive else {
        return Ok(());
    };
    match directive {
        Directive::Config(cd) => {
            // A generic config's reference carries its type parameters as
            // placeholder arguments so instantiation can substitute them.
            let args: Vec<TypeRef> = ty
                .type_params
                .iter()
                .map(|p| TypeRef::builtin(&p.name))
                .collect();
            let node = Config {
                key: NodeKey(format!("{}.{}", pkg.path, ty.name)),
                ty: TypeRef::Named {
                    pkg: pkg.path.clone(),
                    name: ty.name.clone(),
                    pointer: false,
                    args,
                },
                pos: ty.pos.clone(),
                prefix: cd.prefix,
                type_params: ty.type_params.clone(),
                type_args: Vec::new(),
            };
            tracing::debug!(config = %node.key, "discovered config");
            if node.is_generic() {
                pool.generic_configs.insert(node.ty.base_name(), node);
            } else {
                pool.configs.insert(node.ty.key(), node);
            }
            Ok(())
        }
        other => Err(Error::DirectiveInvalid {
            pos: ty.pos.clone(),
            reason: format!(
                "{} directive cannot be attached to a type declaration",
                other.kind()
            ),
        }),
    }
}

fn discover_func(
    ws: &Workspace,
    pkg: &Package,
    func: &FuncDecl,
    parser: &DirectiveParser,
    pool: &mut Pool,
) -> Result<(), Error> {
    let (directive, doc) = directive_of(&func.doc, &func.pos, parser)?;
    let Some(directive) = directive else {
        return Ok(());
    };
    let key = NodeKey(func.qualified_name(&pkg.path));
    match directive {
        Directive::Provider(pd) => {
            let provides = provider_result(func).ok_or(Error::ProviderSignatureInvalid {
                pos: func.pos.clone(),
                func: key.0.clone(),
            })?;
            let mut params: Vec<TypeRef> = Vec::new();
            if let Some(recv) = &func.receiver {
                params.push(recv.clone());
            }
            params.extend(func.params.iter().map(|p| p.ty.clone()));
            let node = Provider {
                key: key.clone(),
                pkg: pkg.path.clone(),
                func: func.name.clone(),
                pos: func.pos.clone(),
                provides: provides.clone(),
                params,
                weak: pd.weak,
                multi: pd.multi,
                require: pd
                    .require
                    .iter()
                    .map(|name| NodeKey(format!("{}.{}", pkg.path, name)))
                    .collect(),
                type_params: func.type_params.clone(),
                type_args: Vec::new(),
            };
            tracing::debug!(provider = %node.key, provides = %provides, "discovered provider");
            if node.is_generic() {
                pool.generic_providers
                    .entry(provides.base_name())
                    .or_default()
                    .push(node);
            } else {
                pool.providers
                    .entry(provides.key())
                    .or_default()
                    .push(node);
            }
            Ok(())
        }
        Directive::Config(_) => Err(Error::DirectiveInvalid {
            pos: func.pos.clone(),
            reason: "config directive must be attached to a type declaration".to_string(),
        }),
        Directive::Api(ad) => {
            let receiver = func.receiver.clone().ok_or_else(|| Error::DirectiveInvalid {
                pos: func.pos.clone(),
                reason: "api directive must be attached to a method".to_string(),
            })?;
            let wildcards = ad.pattern.wildcards();
            let mut params = Vec::new();
            let mut payload_seen = false;
            for param in &func.params {
                let categorized = categorize_api_param(ws, param, &wildcards).ok_or_else(|| {
                    Error::ApiParamInvalid {
                        pos: func.pos.clone(),
                        func: key.0.clone(),
                        param: param.name.clone(),
                        reason: format!("type {} is not injectable here", param.ty),
                    }
                })?;
                if matches!(categorized, ApiParam::Payload { .. }) {
                    if payload_seen {
                        return Err(Error::ApiParamInvalid {
                            pos: func.pos.clone(),
                            func: key.0.clone(),
                            param: param.name.clone(),
                            reason: "at most one body parameter is allowed".to_string(),
                        });
                    }
                    payload_seen = true;
                }
                params.push(categorized);
            }
            let result = api_result(func).ok_or(Error::ApiResultInvalid {
                pos: func.pos.clone(),
                func: key.0.clone(),
            })?;
            tracing::debug!(api = %key, pattern = %ad.pattern.pattern_string(), "discovered API");
            pool.apis.push(Api {
                key,
                pos: func.pos.clone(),
                receiver,
                method_name: func.name.clone(),
                pattern: ad.pattern,
                labels: ad.labels,
                params,
                result,
                doc,
            });
            Ok(())
        }
        Directive::Cron(cd) => {
            let receiver = func.receiver.clone().ok_or(Error::CronSignatureInvalid {
                pos: func.pos.clone(),
                func: key.0.clone(),
            })?;
            let ctx_only = func.params.len() == 1 && func.params[0].ty == wellknown::context();
            let err_only = func.results.len() == 1 && func.results[0] == wellknown::error_ty();
            if !ctx_only || !err_only {
                return Err(Error::CronSignatureInvalid {
                    pos: func.pos.clone(),
                    func: key.0.clone(),
                });
            }
            pool.crons.push(Cron {
                key,
                pos: func.pos.clone(),
                receiver,
                method_name: func.name.clone(),
                schedule: cd.schedule,
                raw_schedule: cd.raw,
            });
            Ok(())
        }
        Directive::Subscribe => {
            let invalid = || Error::SubscribeSignatureInvalid {
                pos: func.pos.clone(),
                func: key.0.clone(),
            };
            let receiver = func.receiver.clone().ok_or_else(|| invalid())?;
            if func.params.len() != 2
                || func.params[0].ty != wellknown::context()
                || func.results.len() != 1
                || func.results[0] != wellknown::error_ty()
            {
                return Err(invalid());
            }
            let event = match &func.params[1].ty {
                TypeRef::Named {
                    pkg: p,
                    name,
                    pointer: false,
                    args,
                } if p == wellknown::RUNTIME_PKG && name == "Event" && args.len() == 1 => {
                    args[0].clone()
                }
                _ => return Err(invalid()),
            };
            pool.subscriptions.push(Subscription {
                key,
                pos: func.pos.clone(),
                receiver,
                method_name: func.name.clone(),
                event,
            });
            Ok(())
        }
        Directive::Middleware(md) => {
            if func.receiver.is_some() {
                return Err(Error::MiddlewareSignatureInvalid {
                    pos: func.pos.clone(),
                    func: key.0.clone(),
                    reason: "middleware must be a free function".to_string(),
                });
            }
            let handler = wellknown::handler();
            let direct = func.params.len() == 1
                && func.params[0].ty == handler
                && func.results.len() == 1
                && func.results[0] == handler;
            if direct {
                pool.middleware.push(Middleware {
                    key,
                    pos: func.pos.clone(),
                    func: func.name.clone(),
                    labels: md.labels,
                    factory: false,
                    deps: Vec::new(),
                    label_params: Vec::new(),
                });
                return Ok(());
            }
            let factory_result = func.results.len() == 1
                && (func.results[0] == wellknown::middleware_alias()
                    || func.results[0]
                        == TypeRef::func(vec![handler.clone()], vec![handler.clone()]));
            if !factory_result {
                return Err(Error::MiddlewareSignatureInvalid {
                    pos: func.pos.clone(),
                    func: key.0.clone(),
                    reason: "signature must be (Handler) Handler, (deps...) Middleware, or (deps...) func(Handler) Handler"
                        .to_string(),
                });
            }
            let mut deps = Vec::new();
            let mut label_params = Vec::new();
            for param in &func.params {
                if param.ty.is_scalar_binding() {
                    if !md.labels.contains(&param.name) {
                        return Err(Error::MiddlewareLabelMismatch {
                            pos: func.pos.clone(),
                            func: key.0.clone(),
                            param: param.name.clone(),
                        });
                    }
                    label_params.push(param.clone());
                } else {
                    deps.push(param.ty.clone());
                }
            }
            pool.middleware.push(Middleware {
                key,
                pos: func.pos.clone(),
                func: func.name.clone(),
                labels: md.labels,
                factory: true,
                deps,
                label_params,
            });
            Ok(())
        }
    }
}

/// `(T)` or `(T, error)`.
fn provider_result(func: &FuncDecl) -> Option<TypeRef> {
    match func.results.as_slice() {
        [t] if *t != wellknown::error_ty() => Some(t.clone()),
        [t, e] if *e == wellknown::error_ty() => Some(t.clone()),
        _ => None,
    }
}

/// `()`, `(error)`, `(T)` or `(T, error)`.
fn api_result(func: &FuncDecl) -> Option<ApiResult> {
    match func.results.as_slice() {
        [] => Some(ApiResult::Empty),
        [e] if *e == wellknown::error_ty() => Some(ApiResult::Error),
        [t] => Some(ApiResult::Value(t.clone())),
        [t, e] if *e == wellknown::error_ty() => Some(ApiResult::ValueError(t.clone())),
        _ => None,
    }
}

fn categorize_api_param(
    ws: &Workspace,
    param: &weft_model::Param,
    wildcards: &[&str],
) -> Option<ApiParam> {
    let ty = &param.ty;
    if *ty == wellknown::context() {
        return Some(ApiParam::Context);
    }
    if *ty == wellknown::response_writer() {
        return Some(ApiParam::ResponseWriter);
    }
    if *ty == wellknown::request() {
        return Some(ApiParam::Request);
    }
    if *ty == wellknown::byte_reader() {
        return Some(ApiParam::BodyReader);
    }
    let bindable =
        ty.is_scalar_binding() || ws.implements(ty, &wellknown::text_unmarshaler());
    if bindable && wildcards.contains(&param.name.as_str()) {
        return Some(ApiParam::Wildcard {
            name: param.name.clone(),
            ty: ty.clone(),
        });
    }
    // A struct (or pointer to one) becomes the body on write methods and
    // query parameters otherwise.
    if let Some(decl) = ws.lookup_type(ty) {
        if decl.kind == TypeKind::Struct {
            return Some(ApiParam::Payload { ty: ty.clone() });
        }
    }
    None
}

/// Handlers cannot live on config types.
fn check_config_receivers(pool: &Pool) -> Result<(), Error> {
    let mut offenders: Vec<(&Pos, &NodeKey, TypeRef)> = Vec::new();
    for api in &pool.apis {
        offenders.push((&api.pos, &api.key, api.receiver.clone()));
    }
    for cron in &pool.crons {
        offenders.push((&cron.pos, &cron.key, cron.receiver.clone()));
    }
    for sub in &pool.subscriptions {
        offenders.push((&sub.pos, &sub.key, sub.receiver.clone()));
    }
    offenders.sort_by_key(|(pos, _, _)| (pos.file.clone(), pos.line, pos.column));
    for (pos, key, receiver) in offenders {
        if pool.config_for(&receiver).is_some() {
            return Err(Error::ApiOnConfig {
                pos: pos.clone(),
                func: key.0.clone(),
                type_key: receiver.value_form().key(),
            });
        }
    }
    Ok(())
}

/// A type key must not mix multi and non-multi providers.
fn check_mixed_multi(pool: &Pool) -> Result<(), Error> {
    let mut violations: Vec<(&String, &Vec<Provider>)> = pool
        .providers
        .iter()
        .filter(|(_, list)| {
            list.iter().any(|p| p.multi) && list.iter().any(|p| !p.multi)
        })
        .collect();
    violations.sort_by(|a, b| a.0.cmp(b.0));
    if let Some((key, list)) = violations.first() {
        let mut names: Vec<String> = list.iter().map(|p| p.key.0.clone()).collect();
        names.sort();
        let pos = list
            .iter()
            .map(|p| &p.pos)
            .min_by_key(|p| (p.file.clone(), p.line, p.column))
            .cloned()
            .unwrap_or_default();
        return Err(Error::MixedMultiAndSingle {
            pos,
            type_key: (*key).clone(),
            providers: names,
        });
    }
    Ok(())
}
