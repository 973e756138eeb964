//! Template argument matching and overload selection
//!
//! Parameters are matched left to right against explicit arguments, then
//! against arguments deduced from a call or from a parametrized constraint,
//! then against their defaults. Candidates sharing a name are all tried;
//! the full match with the most constrained or specialized parameters wins
//! and equal counts go to the earlier declaration. Constraints are counted,
//! not compared: `T : B` does not beat `T : A` even when `B` derives from `A`.

use crate::guard::step;
use crate::{AbstractType, ResolutionContext, ResolutionError, TemplateBinding};
use ds_const_eval::ConstValue;
use ds_dom::{DeclId, DeclKind, DeclRef, Module, PrimitiveKind, TemplateArg, TemplateParameter, TypeRef, TypeRefId};
use ds_intern::Symbol;
use ds_span::Span;
use rustc_hash::FxHashSet;
use std::collections::VecDeque;
use tracing::{debug, trace};

/// An explicit template argument, evaluated where it is written
#[derive(Debug, Clone)]
pub(crate) struct ExplicitArg {
    /// Resolution of an argument written in type position
    pub(crate) symbol: Option<AbstractType>,
    /// Value of the argument when it folds to a constant
    pub(crate) constant: Option<ConstValue>,
    pub(crate) span: Span,
}

/// Function parameters paired with the types of a call's arguments
#[derive(Clone, Copy)]
pub(crate) struct CallArgs<'a> {
    pub(crate) parameters: &'a [DeclId],
    pub(crate) types: &'a [Option<AbstractType>],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// The argument is the pattern type or derives from it
    Constraint,
    /// The argument is the pattern type
    Exact,
    /// The argument converts to the pattern type
    Implicit,
}

type Bound = Vec<Option<TemplateBinding>>;

impl ResolutionContext<'_> {
    /// Resolve and fold explicit template arguments in the current scope
    pub(crate) fn prepare_args(&mut self, args: &[TemplateArg]) -> Vec<ExplicitArg> {
        let source = self.source();
        args.iter()
            .map(|arg| match *arg {
                TemplateArg::Type(ty) => {
                    let symbol = self.resolve_type_ref(ty).ok();
                    let constant = symbol.as_ref().and_then(|symbol| self.symbol_constant(symbol));
                    ExplicitArg {
                        symbol,
                        constant,
                        span: source.types[ty].span(),
                    }
                }
                TemplateArg::Value(expr) => ExplicitArg {
                    symbol: None,
                    constant: self.constant_of(expr).ok(),
                    span: source.exprs[expr].span(),
                },
            })
            .collect()
    }

    /// Value of a resolved symbol used where a constant is expected
    fn symbol_constant(&mut self, symbol: &AbstractType) -> Option<ConstValue> {
        match symbol {
            AbstractType::Member { decl, .. }
                if self.module_of(*decl).decls[decl.decl].is_manifest_constant() =>
            {
                self.manifest_constant(*decl).ok()
            }
            AbstractType::TemplateParameter {
                binding: Some(binding), ..
            } => match binding.as_ref() {
                TemplateBinding::Value(value) => Some(*value),
                _ => None,
            },
            _ => None,
        }
    }

    /// Bind every template parameter of `template`
    ///
    /// # Errors
    ///
    /// - `ArityMismatch` when there are more explicit arguments than
    ///   parameters, or a parameter is left without argument, deduction or
    ///   default
    /// - `ConstraintNotSatisfied` when an argument fails its parameter's
    ///   constraint or specialization
    /// - `NotConstant` when a value parameter receives a non-constant
    pub(crate) fn match_template(
        &mut self,
        template: DeclRef,
        explicit: &[ExplicitArg],
        call: Option<CallArgs<'_>>,
    ) -> Result<Vec<TemplateBinding>, ResolutionError> {
        let source = self.module_of(template);
        let params = source.decls[template.decl].template_parameters.clone();
        if explicit.len() > params.len() {
            return Err(ResolutionError::ArityMismatch {
                decl: template,
                expected: params.len(),
                found: explicit.len(),
            });
        }

        self.with_declaration_scope(template, true, |this| {
            let mut bound: Bound = vec![None; params.len()];
            for (index, arg) in explicit.iter().enumerate() {
                let binding = this.match_parameter(template, &params, index, arg, &mut bound)?;
                if let Some(deduced) = &bound[index]
                    && !deduced.same_binding(&binding)
                {
                    return Err(ResolutionError::ConstraintNotSatisfied {
                        decl: template,
                        parameter: DeclRef::new(template.module, params[index]),
                    });
                }
                bound[index] = Some(binding);
            }

            if let Some(call) = call {
                this.deduce_from_call(template, &params, call, &mut bound)?;
            }

            for index in explicit.len()..params.len() {
                let parameter = DeclRef::new(template.module, params[index]);
                if bound[index].is_none() {
                    bound[index] = this.parameter_default(template, &params, index, &bound)?;
                }
                let Some(binding) = bound[index].clone() else {
                    return Err(ResolutionError::ArityMismatch {
                        decl: template,
                        expected: params.len(),
                        found: explicit.len(),
                    });
                };
                if let (Some(constraint), TemplateBinding::Type(ty)) = (type_constraint(&source, params[index]), &binding)
                    && !this.pattern_match(&params, constraint, ty, &mut bound, Mode::Constraint)?
                {
                    return Err(ResolutionError::ConstraintNotSatisfied {
                        decl: template,
                        parameter,
                    });
                }
            }

            Ok(bound.into_iter().flatten().collect())
        })
    }

    /// Match one explicit argument against its parameter
    fn match_parameter(
        &mut self,
        template: DeclRef,
        params: &[DeclId],
        index: usize,
        arg: &ExplicitArg,
        bound: &mut Bound,
    ) -> Result<TemplateBinding, ResolutionError> {
        let source = self.module_of(template);
        let parameter = DeclRef::new(template.module, params[index]);
        let unsatisfied = ResolutionError::ConstraintNotSatisfied {
            decl: template,
            parameter,
        };
        let DeclKind::TemplateParameter(kind) = &source.decls[params[index]].kind else {
            return Err(unsatisfied);
        };

        match kind {
            TemplateParameter::Type { constraint, .. } => {
                let Some(ty) = arg.symbol.clone().filter(AbstractType::is_type) else {
                    return Err(unsatisfied);
                };
                if let Some(constraint) = constraint
                    && !self.pattern_match(params, *constraint, &ty, bound, Mode::Constraint)?
                {
                    trace!(?template, index, "type argument fails its constraint");
                    return Err(unsatisfied);
                }
                Ok(TemplateBinding::Type(ty))
            }
            TemplateParameter::Value {
                ty, specialization, ..
            } => {
                let value = arg.constant.ok_or(ResolutionError::NotConstant { span: arg.span })?;
                let kind = self.resolve_type_ref(*ty)?.primitive();
                let value = convert(value, kind).ok_or_else(|| unsatisfied.clone())?;
                if let Some(specialization) = specialization {
                    let expected = self.constant_of(*specialization)?;
                    if convert(expected, kind) != Some(value) {
                        trace!(?template, index, %value, "value argument fails its specialization");
                        return Err(unsatisfied);
                    }
                }
                Ok(TemplateBinding::Value(value))
            }
            TemplateParameter::Alias { .. } => match (&arg.symbol, arg.constant) {
                (Some(symbol), _) => Ok(symbol_binding(symbol.clone())),
                (None, Some(value)) => Ok(TemplateBinding::Value(value)),
                (None, None) => Err(unsatisfied),
            },
        }
    }

    /// Deduce parameters from the types of a call's arguments
    fn deduce_from_call(
        &mut self,
        template: DeclRef,
        params: &[DeclId],
        call: CallArgs<'_>,
        bound: &mut Bound,
    ) -> Result<(), ResolutionError> {
        let source = self.module_of(template);
        for (&parameter, arg) in call.parameters.iter().zip(call.types) {
            let (Some(arg), DeclKind::Variable { ty: Some(pattern), .. }) = (arg, &source.decls[parameter].kind) else {
                continue;
            };
            if !self.pattern_match(params, *pattern, arg, bound, Mode::Implicit)? {
                return Err(ResolutionError::ConstraintNotSatisfied {
                    decl: template,
                    parameter: DeclRef::new(template.module, parameter),
                });
            }
        }
        Ok(())
    }

    /// Default of the parameter at `index`, with earlier bindings in scope
    fn parameter_default(
        &mut self,
        template: DeclRef,
        params: &[DeclId],
        index: usize,
        bound: &Bound,
    ) -> Result<Option<TemplateBinding>, ResolutionError> {
        let source = self.module_of(template);
        let earlier: Vec<_> = params
            .iter()
            .zip(bound)
            .filter_map(|(&param, binding)| Some((DeclRef::new(template.module, param), binding.clone()?)))
            .collect();
        let DeclKind::TemplateParameter(kind) = &source.decls[params[index]].kind else {
            return Ok(None);
        };

        // `class A(T = A)` comes back here with `T` still unbound
        let parameter = DeclRef::new(template.module, params[index]);
        self.guarded(parameter, step::DEFAULT, |this| {
            this.with_bindings(earlier, |this| this.evaluate_default(template, parameter, kind))
        })
    }

    fn evaluate_default(
        &mut self,
        template: DeclRef,
        parameter: DeclRef,
        kind: &TemplateParameter,
    ) -> Result<Option<TemplateBinding>, ResolutionError> {
        match kind {
            TemplateParameter::Type { default: Some(default), .. } => {
                self.resolve_type_ref(*default).map(|ty| Some(TemplateBinding::Type(ty)))
            }
            TemplateParameter::Value {
                ty, default: Some(default), ..
            } => {
                let value = self.constant_of(*default)?;
                let kind = self.resolve_type_ref(*ty)?.primitive();
                let value = convert(value, kind).ok_or(ResolutionError::ConstraintNotSatisfied {
                    decl: template,
                    parameter,
                })?;
                Ok(Some(TemplateBinding::Value(value)))
            }
            TemplateParameter::Alias { default: Some(default) } => {
                self.resolve_type_ref(*default).map(|symbol| Some(symbol_binding(symbol)))
            }
            _ => Ok(None),
        }
    }

    /// Match `arg` against the type expression `pattern` of the template
    /// whose scope is on the stack, deducing parameters named in it
    fn pattern_match(
        &mut self,
        params: &[DeclId],
        pattern: TypeRefId,
        arg: &AbstractType,
        bound: &mut Bound,
        mode: Mode,
    ) -> Result<bool, ResolutionError> {
        let source = self.source();
        if let TypeRef::Identifier { name, .. } = &source.types[pattern]
            && let Some(index) = parameter_named(&source, params, *name)
        {
            return Ok(deduce(bound, index, TemplateBinding::Type(arg.clone()), mode));
        }
        match &source.types[pattern] {
            TypeRef::Array { element, .. } => match arg.unqualified() {
                AbstractType::Array(inner) => self.pattern_match(params, *element, inner, bound, Mode::Exact),
                _ => Ok(false),
            },
            TypeRef::Pointer { pointee, .. } => match arg.unqualified() {
                AbstractType::Pointer(inner) => self.pattern_match(params, *pointee, inner, bound, Mode::Exact),
                AbstractType::Primitive(PrimitiveKind::Null) => Ok(mode == Mode::Implicit),
                _ => Ok(false),
            },
            TypeRef::Modified { modifier, inner, .. } => match arg.terminal() {
                AbstractType::Modified {
                    modifier: actual,
                    inner: actual_inner,
                } if actual == modifier => self.pattern_match(params, *inner, actual_inner, bound, Mode::Exact),
                other if mode == Mode::Implicit => {
                    let other = other.unqualified().clone();
                    self.pattern_match(params, *inner, &other, bound, Mode::Exact)
                }
                _ => Ok(false),
            },
            TypeRef::TemplateInstance { name, args, .. } => {
                let candidates = self.lookup_name(*name);
                let mut chain: VecDeque<AbstractType> = VecDeque::from([arg.unqualified().clone()]);
                let mut visited = FxHashSet::default();
                while let Some(current) = chain.pop_front() {
                    if let AbstractType::TemplateInstance { decl, arguments, .. } = current.unqualified()
                        && candidates.contains(decl)
                        && arguments.len() >= args.len()
                    {
                        let snapshot = bound.clone();
                        if self.match_instance_args(params, args, arguments, bound)? {
                            return Ok(true);
                        }
                        *bound = snapshot;
                    }
                    if mode != Mode::Exact {
                        for base in current.bases() {
                            if base.aggregate().is_none_or(|decl| visited.insert(decl)) {
                                chain.push_back(base.clone());
                            }
                        }
                    }
                }
                Ok(false)
            }
            _ => {
                let expected = self.resolve_type_ref(pattern)?;
                Ok(match mode {
                    Mode::Constraint => arg.derives_from(&expected),
                    Mode::Exact => arg.same_type(&expected),
                    Mode::Implicit => converts(arg, &expected),
                })
            }
        }
    }

    /// Pairwise match of a pattern's explicit arguments against an
    /// instance's bindings
    fn match_instance_args(
        &mut self,
        params: &[DeclId],
        patterns: &[TemplateArg],
        arguments: &[TemplateBinding],
        bound: &mut Bound,
    ) -> Result<bool, ResolutionError> {
        let source = self.source();
        for (pattern, argument) in patterns.iter().zip(arguments) {
            let matched = match (*pattern, argument) {
                (TemplateArg::Type(pattern), TemplateBinding::Type(ty)) => {
                    self.pattern_match(params, pattern, ty, bound, Mode::Exact)?
                }
                (TemplateArg::Type(pattern), other) => {
                    let deducible = match &source.types[pattern] {
                        TypeRef::Identifier { name, .. } => parameter_named(&source, params, *name),
                        _ => None,
                    };
                    if let Some(index) = deducible {
                        deduce(bound, index, other.clone(), Mode::Exact)
                    } else {
                        let symbol = self.resolve_type_ref(pattern)?;
                        match other {
                            TemplateBinding::Symbol(decl) => symbol.declaration() == Some(*decl),
                            TemplateBinding::Value(value) => self.symbol_constant(&symbol) == Some(*value),
                            TemplateBinding::Type(_) => false,
                        }
                    }
                }
                (TemplateArg::Value(expr), TemplateBinding::Value(value)) => self
                    .constant_of(expr)
                    .is_ok_and(|expected| expected.convert_to(value.kind) == Some(*value)),
                (TemplateArg::Value(_), _) => false,
            };
            if !matched {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Instantiate `candidate` with explicit arguments
    pub(crate) fn instantiate(
        &mut self,
        candidate: DeclRef,
        explicit: &[ExplicitArg],
    ) -> Result<AbstractType, ResolutionError> {
        let source = self.module_of(candidate);
        let decl = &source.decls[candidate.decl];
        if !decl.is_template() {
            if let DeclKind::Alias { .. } = decl.kind
                && let Some(target) = self.resolve_decl(candidate)?.terminal().declaration()
                && target != candidate
            {
                return self.instantiate(target, explicit);
            }
            return Err(ResolutionError::ArityMismatch {
                decl: candidate,
                expected: 0,
                found: explicit.len(),
            });
        }
        let arguments = self.match_template(candidate, explicit, None)?;
        Ok(self.instance(candidate, arguments))
    }

    /// The result of binding `decl`'s parameters to `arguments`
    pub(crate) fn instance(&mut self, decl: DeclRef, arguments: Vec<TemplateBinding>) -> AbstractType {
        let source = self.module_of(decl);
        if let DeclKind::Function { .. } = source.decls[decl.decl].kind {
            let bindings = parameter_bindings(&source, decl, &arguments);
            let ty = self.with_bindings(bindings, |this| this.declaration_type(decl)).ok();
            return AbstractType::Member {
                decl,
                ty: ty.map(Box::new),
            };
        }
        let bases = self.instance_bases(decl, &arguments);
        AbstractType::TemplateInstance { decl, arguments, bases }
    }

    /// The candidate `explicit` instantiates
    ///
    /// Among the candidates that match, one with more constrained or
    /// specialized parameters wins; ties go to declaration order whatever
    /// the constraint types are.
    ///
    /// # Errors
    ///
    /// The most telling failure among the candidates when none matches.
    pub(crate) fn select_template(
        &mut self,
        name: Symbol,
        span: Span,
        candidates: &[DeclRef],
        explicit: &[ExplicitArg],
    ) -> Result<AbstractType, ResolutionError> {
        let mut failure = None;
        let mut selected: Option<(usize, DeclRef, AbstractType)> = None;
        for &candidate in candidates {
            match self.instantiate(candidate, explicit) {
                Ok(resolved) => {
                    let specialized = specialized_parameters(&self.module_of(candidate), candidate);
                    if selected.as_ref().is_none_or(|(best, ..)| specialized > *best) {
                        selected = Some((specialized, candidate, resolved));
                    }
                }
                Err(error) => {
                    trace!(?candidate, %error, "template candidate rejected");
                    keep_worst(&mut failure, error);
                }
            }
        }
        if let Some((_, candidate, resolved)) = selected {
            debug!(name = self.interner().resolve(name), ?candidate, "template overload selected");
            return Ok(resolved);
        }
        Err(failure.unwrap_or(ResolutionError::Unresolved { name: Some(name), span }))
    }

    /// The overload a call with argument types `args` selects
    ///
    /// # Errors
    ///
    /// `AmbiguousOverload` when several candidates exist and none accepts
    /// the arguments. A single candidate is returned even if it rejects them.
    pub(crate) fn select_call(
        &mut self,
        name: Symbol,
        candidates: Vec<DeclRef>,
        explicit: Option<&[ExplicitArg]>,
        args: &[Option<AbstractType>],
    ) -> Result<AbstractType, ResolutionError> {
        let mut failure = None;
        for &candidate in &candidates {
            let is_function = matches!(
                self.module_of(candidate).decls[candidate.decl].kind,
                DeclKind::Function { .. }
            );
            let attempt = match (is_function, explicit) {
                (true, _) => self.call_function(candidate, explicit, args),
                (false, Some(explicit)) => self.instantiate(candidate, explicit),
                (false, None) => self.resolve_decl(candidate),
            };
            match attempt {
                Ok(resolved) => {
                    debug!(name = self.interner().resolve(name), ?candidate, "call target selected");
                    return Ok(resolved);
                }
                Err(error) => {
                    trace!(?candidate, %error, "call candidate rejected");
                    keep_worst(&mut failure, error);
                }
            }
        }
        match (candidates.as_slice(), failure) {
            (_, Some(error @ ResolutionError::RecursionLimitExceeded { .. })) => Err(error),
            ([single], _) => self.resolve_decl(*single),
            _ => Err(ResolutionError::AmbiguousOverload { name, candidates }),
        }
    }

    fn call_function(
        &mut self,
        function: DeclRef,
        explicit: Option<&[ExplicitArg]>,
        args: &[Option<AbstractType>],
    ) -> Result<AbstractType, ResolutionError> {
        let source = self.module_of(function);
        let decl = &source.decls[function.decl];
        let DeclKind::Function { parameters, .. } = &decl.kind else {
            return self.resolve_decl(function);
        };
        let required = parameters
            .iter()
            .filter(|&&parameter| {
                !matches!(
                    source.decls[parameter].kind,
                    DeclKind::Variable {
                        initializer: Some(_),
                        ..
                    }
                )
            })
            .count();
        if args.len() > parameters.len() || args.len() < required {
            return Err(ResolutionError::ArityMismatch {
                decl: function,
                expected: parameters.len(),
                found: args.len(),
            });
        }

        if decl.is_template() {
            let call = CallArgs {
                parameters,
                types: args,
            };
            let arguments = self.match_template(function, explicit.unwrap_or_default(), Some(call))?;
            return Ok(self.instance(function, arguments));
        }
        if let Some(explicit) = explicit
            && !explicit.is_empty()
        {
            return Err(ResolutionError::ArityMismatch {
                decl: function,
                expected: 0,
                found: explicit.len(),
            });
        }

        for (&parameter, arg) in parameters.iter().zip(args) {
            let parameter = DeclRef::new(function.module, parameter);
            let Some(arg) = arg else {
                continue;
            };
            let accepted = self
                .declaration_type(parameter)
                .map_or(true, |expected| converts(arg, &expected));
            if !accepted {
                return Err(ResolutionError::ConstraintNotSatisfied {
                    decl: function,
                    parameter,
                });
            }
        }
        let ty = self.declaration_type(function).ok();
        Ok(AbstractType::Member {
            decl: function,
            ty: ty.map(Box::new),
        })
    }

    /// Whether `function`'s first parameter accepts a `receiver` argument
    pub(crate) fn accepts_receiver(&mut self, function: DeclRef, receiver: &AbstractType) -> bool {
        let source = self.module_of(function);
        let decl = &source.decls[function.decl];
        let DeclKind::Function { parameters, .. } = &decl.kind else {
            return false;
        };
        let Some(&first) = parameters.first() else {
            return false;
        };
        if decl.is_template() {
            let DeclKind::Variable { ty: Some(pattern), .. } = source.decls[first].kind else {
                return true;
            };
            let params = decl.template_parameters.clone();
            let mut bound = vec![None; params.len()];
            return self
                .with_declaration_scope(function, true, |this| {
                    this.pattern_match(&params, pattern, receiver, &mut bound, Mode::Implicit)
                })
                .unwrap_or(false);
        }
        self.declaration_type(DeclRef::new(function.module, first))
            .is_ok_and(|expected| converts(receiver, &expected))
    }
}

/// Pair template parameters of `decl` with their bindings
pub(crate) fn parameter_bindings(
    source: &Module,
    decl: DeclRef,
    arguments: &[TemplateBinding],
) -> Vec<(DeclRef, TemplateBinding)> {
    source.decls[decl.decl]
        .template_parameters
        .iter()
        .zip(arguments)
        .map(|(&param, binding)| (DeclRef::new(decl.module, param), binding.clone()))
        .collect()
}

/// Whether a value of type `arg` can be passed where `param` is expected
///
/// Accepts identity, numeric to numeric, `null` to references, derived to
/// base and anything involving an unbound template parameter. Qualifiers
/// are ignored.
pub(crate) fn converts(arg: &AbstractType, param: &AbstractType) -> bool {
    let (arg, param) = (arg.unqualified(), param.unqualified());
    if arg.same_type(param) {
        return true;
    }
    match (arg, param) {
        (AbstractType::TemplateParameter { binding: None, .. }, _)
        | (_, AbstractType::TemplateParameter { binding: None, .. }) => true,
        (AbstractType::Primitive(from), AbstractType::Primitive(to)) => arithmetic(*from) && arithmetic(*to),
        (
            AbstractType::Primitive(PrimitiveKind::Null),
            AbstractType::Pointer(_)
            | AbstractType::Array(_)
            | AbstractType::Aggregate { .. }
            | AbstractType::TemplateInstance { .. },
        ) => true,
        (
            AbstractType::Aggregate { .. } | AbstractType::TemplateInstance { .. },
            AbstractType::Aggregate { .. } | AbstractType::TemplateInstance { .. },
        ) => arg.derives_from(param),
        (AbstractType::Array(from), AbstractType::Array(to)) => from.unqualified().same_type(to.unqualified()),
        _ => false,
    }
}

const fn arithmetic(kind: PrimitiveKind) -> bool {
    kind.is_numeric() || matches!(kind, PrimitiveKind::Bool)
}

fn convert(value: ConstValue, kind: Option<PrimitiveKind>) -> Option<ConstValue> {
    match kind {
        Some(kind) => value.convert_to(kind),
        None => Some(value),
    }
}

/// Binding for an alias parameter: the declaration when there is one
fn symbol_binding(symbol: AbstractType) -> TemplateBinding {
    match symbol.declaration() {
        Some(decl) => TemplateBinding::Symbol(decl),
        None => TemplateBinding::Type(symbol),
    }
}

/// Number of parameters with a constraint or specialization
fn specialized_parameters(source: &Module, decl: DeclRef) -> usize {
    source.decls[decl.decl]
        .template_parameters
        .iter()
        .filter(|&&param| {
            matches!(
                source.decls[param].kind,
                DeclKind::TemplateParameter(
                    TemplateParameter::Type {
                        constraint: Some(_),
                        ..
                    } | TemplateParameter::Value {
                        specialization: Some(_),
                        ..
                    }
                )
            )
        })
        .count()
}

fn type_constraint(source: &Module, param: DeclId) -> Option<TypeRefId> {
    match source.decls[param].kind {
        DeclKind::TemplateParameter(TemplateParameter::Type { constraint, .. }) => constraint,
        _ => None,
    }
}

fn parameter_named(source: &Module, params: &[DeclId], name: Symbol) -> Option<usize> {
    params.iter().position(|&param| source.decls[param].name == Some(name))
}

/// Record a deduced binding, or check it against an earlier one
fn deduce(bound: &mut Bound, index: usize, binding: TemplateBinding, mode: Mode) -> bool {
    match &bound[index] {
        Some(TemplateBinding::Type(existing)) if mode == Mode::Implicit => {
            binding.as_type().is_some_and(|ty| converts(ty, existing))
        }
        Some(existing) => existing.same_binding(&binding),
        None => {
            bound[index] = Some(binding);
            true
        }
    }
}

fn keep_worst(failure: &mut Option<ResolutionError>, error: ResolutionError) {
    if failure.as_ref().is_none_or(|current| error.severity() > current.severity()) {
        *failure = Some(error);
    }
}

#[cfg(test)]
mod tests {
    use super::converts;
    use crate::AbstractType;
    use ds_dom::{PrimitiveKind, TypeModifier};

    #[test]
    fn test_primitive_conversions() {
        let int = AbstractType::Primitive(PrimitiveKind::Int);
        let double = AbstractType::Primitive(PrimitiveKind::Double);
        let null = AbstractType::Primitive(PrimitiveKind::Null);
        let void = AbstractType::Primitive(PrimitiveKind::Void);
        assert!(converts(&int, &double));
        assert!(converts(&double, &int));
        assert!(!converts(&null, &int));
        assert!(!converts(&int, &void));
        assert!(converts(&null, &AbstractType::Pointer(Box::new(int.clone()))));
    }

    #[test]
    fn test_qualifiers_are_ignored() {
        let char_type = AbstractType::Primitive(PrimitiveKind::Char);
        let string = AbstractType::Array(Box::new(AbstractType::Modified {
            modifier: TypeModifier::Immutable,
            inner: Box::new(char_type.clone()),
        }));
        let chars = AbstractType::Array(Box::new(char_type));
        assert!(converts(&string, &chars));
        assert!(!converts(&string, &AbstractType::Primitive(PrimitiveKind::Int)));
    }
}
