//! Symbol and type resolution
//!
//! The public methods are the externally initiated queries: each one clears
//! the recursion guard before descending. Everything they call is internal
//! and shares the guard of the query it runs in.

use crate::guard::step;
use crate::templates::{ExplicitArg, parameter_bindings};
use crate::ty::signature;
use crate::{AbstractType, ResolutionContext, ResolutionError, TemplateBinding};
use ds_const_eval::{ConstEvaluator, ConstValue};
use ds_dom::{
    AggregateKind, BinaryOp, DeclKind, DeclRef, Expr, ExprId, Keyword, LiteralKind, Module, PrimitiveKind, ScopeNode,
    Stmt, StmtId, TemplateParameter, TypeModifier, TypeRef, TypeRefId, UnaryOp,
};
use ds_intern::Symbol;
use ds_span::Span;
use rustc_hash::FxHashSet;
use std::collections::VecDeque;
use tracing::{debug, trace};

type Bindings = Vec<(DeclRef, TemplateBinding)>;

const STACK_RED_ZONE: usize = 128 * 1024;
const STACK_SEGMENT: usize = 2 * 1024 * 1024;

impl ResolutionContext<'_> {
    /// What `name` means at the current position
    ///
    /// A single visible declaration is resolved directly. Several are only
    /// narrowed down when they are all templates whose defaults select one.
    /// Aliases resolve to [`AbstractType::Alias`] with a terminal target.
    ///
    /// # Errors
    ///
    /// `Unresolved` when nothing is visible, `AmbiguousOverload` when
    /// several declarations remain, and whatever resolving the declaration
    /// reports (`RecursionLimitExceeded` for alias cycles).
    pub fn resolve_identifier(&mut self, name: Symbol, span: Span) -> Result<AbstractType, ResolutionError> {
        self.guard.reset();
        debug!(name = self.interner().resolve(name), %span, "resolve identifier");
        self.resolve_name(name, span, None)
    }

    /// Resolve a type expression of the current module
    ///
    /// # Errors
    ///
    /// Any resolution failure of a name inside the expression, or of the
    /// template argument matching of an instantiation.
    pub fn resolve_type(&mut self, ty: TypeRefId) -> Result<AbstractType, ResolutionError> {
        self.guard.reset();
        self.resolve_type_ref(ty)
    }

    /// The symbol an expression names: the declaration behind an
    /// identifier, instantiation, member access or call, or the type of any
    /// other expression
    ///
    /// # Errors
    ///
    /// Any resolution failure along the expression.
    pub fn resolve_expression(&mut self, expr: ExprId) -> Result<AbstractType, ResolutionError> {
        self.guard.reset();
        self.expression_symbol(expr)
    }

    /// The type of an expression of the current module
    ///
    /// # Errors
    ///
    /// Any resolution failure along the expression; `Unresolved` with no
    /// name when the expression has no type (a missing identifier, indexing
    /// a non-array).
    pub fn type_of_expression(&mut self, expr: ExprId) -> Result<AbstractType, ResolutionError> {
        self.guard.reset();
        self.expression_type(expr)
    }

    /// The overload a call expression selects
    ///
    /// Explicit template arguments and the argument types drive the
    /// selection. `receiver.f(args)` without a member `f` falls back to a
    /// module-level `f(receiver, args)`.
    ///
    /// # Errors
    ///
    /// `Unresolved` when the callee does not resolve, `AmbiguousOverload`
    /// when several overloads exist and none accepts the arguments.
    pub fn resolve_call_target(&mut self, call: ExprId) -> Result<AbstractType, ResolutionError> {
        self.guard.reset();
        self.call_target(call)
    }

    /// Resolve a declaration as if its name had been used
    ///
    /// # Errors
    ///
    /// As [`ResolutionContext::resolve_identifier`].
    pub fn resolve_declaration(&mut self, decl: DeclRef) -> Result<AbstractType, ResolutionError> {
        self.guard.reset();
        self.resolve_decl(decl)
    }

    /// The type of a variable, the return type of a function, or the type a
    /// type declaration stands for
    ///
    /// # Errors
    ///
    /// Resolution failures of the declared type; `RecursionLimitExceeded`
    /// for an `auto` or `typeof` declaration whose type depends on itself.
    pub fn type_of_declaration(&mut self, decl: DeclRef) -> Result<AbstractType, ResolutionError> {
        self.guard.reset();
        self.declaration_type(decl)
    }

    /// Fold an expression of the current module to a constant
    ///
    /// Identifiers naming `const`/`immutable` variables and bound value
    /// parameters are folded through their values.
    ///
    /// # Errors
    ///
    /// `NotConstant` for anything the evaluator does not fold, including
    /// overflow and division by zero.
    pub fn evaluate_constant(&mut self, expr: ExprId) -> Result<ConstValue, ResolutionError> {
        self.guard.reset();
        self.constant_of(expr)
    }

    /// Members of a type (or of the type of a value), including inherited
    /// members not hidden by a nearer declaration
    pub fn members_of(&mut self, ty: &AbstractType) -> Vec<DeclRef> {
        self.guard.reset();
        let Some((target, _)) = self.member_target(ty) else {
            return Vec::new();
        };
        let Some(decl) = target.aggregate() else {
            return Vec::new();
        };
        let source = self.module_of(decl);
        let mut hidden = FxHashSet::default();
        let mut members = Vec::new();
        if let Some(scope) = source.scope(ScopeNode::Decl(decl.decl)) {
            for (name, decls) in scope.iter() {
                let own: Vec<_> = decls
                    .iter()
                    .filter(|&&member| !matches!(source.decls[member].kind, DeclKind::TemplateParameter(_)))
                    .map(|&member| DeclRef::new(decl.module, member))
                    .collect();
                if !own.is_empty() {
                    hidden.insert(name);
                    members.extend(own);
                }
            }
        }
        for member in self.inherited_members(target.bases()) {
            if self.module_of(member).decls[member.decl]
                .name
                .is_some_and(|name| !hidden.contains(&name))
            {
                members.push(member);
            }
        }
        members
    }

    /// Run a recursive step under the guard
    ///
    /// Long chains of distinct steps continue on a fresh stack segment once
    /// the current one runs low.
    pub(crate) fn guarded<T>(
        &mut self,
        decl: DeclRef,
        signature: u64,
        f: impl FnOnce(&mut Self) -> Result<T, ResolutionError>,
    ) -> Result<T, ResolutionError> {
        self.guard.enter(decl, signature)?;
        let result = stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT, || f(self));
        self.guard.leave(decl, signature);
        result
    }

    fn resolve_name(
        &mut self,
        name: Symbol,
        span: Span,
        explicit: Option<&[ExplicitArg]>,
    ) -> Result<AbstractType, ResolutionError> {
        let candidates = self.lookup_name(name);
        self.choose(name, span, candidates, explicit)
    }

    /// Pick from an overload set
    fn choose(
        &mut self,
        name: Symbol,
        span: Span,
        candidates: Vec<DeclRef>,
        explicit: Option<&[ExplicitArg]>,
    ) -> Result<AbstractType, ResolutionError> {
        match (candidates.as_slice(), explicit) {
            ([], _) => Err(ResolutionError::Unresolved { name: Some(name), span }),
            (_, Some(explicit)) => self.select_template(name, span, &candidates, explicit),
            ([single], None) => self.resolve_decl(*single),
            (_, None) => {
                let all_templates = candidates
                    .iter()
                    .all(|candidate| self.module_of(*candidate).decls[candidate.decl].is_template());
                if all_templates && let Ok(resolved) = self.select_template(name, span, &candidates, &[]) {
                    return Ok(resolved);
                }
                Err(ResolutionError::AmbiguousOverload { name, candidates })
            }
        }
    }

    pub(crate) fn resolve_decl(&mut self, decl: DeclRef) -> Result<AbstractType, ResolutionError> {
        let source = self.module_of(decl);
        match &source.decls[decl.decl].kind {
            DeclKind::Module { .. } => Ok(AbstractType::Aggregate {
                decl,
                bases: Vec::new(),
            }),
            DeclKind::Aggregate { .. } => self.aggregate_type(decl),
            DeclKind::Alias { target } => {
                let target = *target;
                let resolved = self.guarded(decl, step::ALIAS, |this| {
                    this.with_declaration_scope(decl, false, |this| this.resolve_type_ref(target))
                })?;
                let target = match resolved {
                    AbstractType::Alias { target, .. } => target,
                    other => Box::new(other),
                };
                Ok(AbstractType::Alias { alias: decl, target })
            }
            DeclKind::Function { .. } | DeclKind::Variable { .. } => {
                let ty = self.declaration_type(decl).ok();
                Ok(AbstractType::Member {
                    decl,
                    ty: ty.map(Box::new),
                })
            }
            DeclKind::TemplateParameter(_) => Ok(AbstractType::TemplateParameter {
                decl,
                binding: self.binding_of(decl).cloned().map(Box::new),
            }),
        }
    }

    /// An aggregate as a type
    ///
    /// Inside an instance the template's own name means that instance;
    /// elsewhere a template name alone instantiates with its defaults. A
    /// template whose defaults do not bind every parameter stays a plain
    /// aggregate, unless evaluating them ran into a cycle.
    fn aggregate_type(&mut self, decl: DeclRef) -> Result<AbstractType, ResolutionError> {
        let source = self.module_of(decl);
        let aggregate = &source.decls[decl.decl];
        if aggregate.is_template() {
            let current: Option<Vec<_>> = aggregate
                .template_parameters
                .iter()
                .map(|&param| self.binding_of(DeclRef::new(decl.module, param)).cloned())
                .collect();
            let arguments = match current {
                Some(arguments) => Some(arguments),
                None => match self.match_template(decl, &[], None) {
                    Ok(arguments) => Some(arguments),
                    Err(error @ ResolutionError::RecursionLimitExceeded { .. }) => return Err(error),
                    Err(_) => None,
                },
            };
            if let Some(arguments) = arguments {
                return Ok(self.instance(decl, arguments));
            }
        }
        Ok(AbstractType::Aggregate {
            decl,
            bases: self.aggregate_bases(decl),
        })
    }

    pub(crate) fn aggregate_bases(&mut self, decl: DeclRef) -> Vec<AbstractType> {
        self.resolve_bases(decl, step::BASES, Vec::new())
    }

    pub(crate) fn instance_bases(&mut self, decl: DeclRef, arguments: &[TemplateBinding]) -> Vec<AbstractType> {
        let bindings = parameter_bindings(&self.module_of(decl), decl, arguments);
        self.resolve_bases(decl, signature(arguments), bindings)
    }

    /// Base list of an aggregate; empty when it is cyclic
    fn resolve_bases(&mut self, decl: DeclRef, signature: u64, bindings: Bindings) -> Vec<AbstractType> {
        let source = self.module_of(decl);
        let aggregate = &source.decls[decl.decl];
        let DeclKind::Aggregate { bases, .. } = &aggregate.kind else {
            return Vec::new();
        };
        if bases.is_empty() {
            return Vec::new();
        }
        let inside = aggregate.is_template();
        self.guarded(decl, signature, |this| {
            Ok(this.with_declaration_scope(decl, inside, |this| {
                this.with_bindings(bindings, |this| {
                    bases
                        .iter()
                        .filter_map(|&base| this.resolve_type_ref(base).ok())
                        .collect()
                })
            }))
        })
        .unwrap_or_default()
    }

    pub(crate) fn resolve_type_ref(&mut self, ty: TypeRefId) -> Result<AbstractType, ResolutionError> {
        let source = self.source();
        match &source.types[ty] {
            TypeRef::Primitive { kind, .. } => Ok(AbstractType::Primitive(*kind)),
            TypeRef::Identifier { name, span } => self.resolve_name(*name, *span, None),
            TypeRef::TemplateInstance {
                name, name_span, args, ..
            } => {
                let explicit = self.prepare_args(args);
                self.resolve_name(*name, *name_span, Some(&explicit))
            }
            TypeRef::Member { base, member, .. } => {
                let base = self.resolve_type_ref(*base)?;
                let (name, span, explicit) = match &source.types[*member] {
                    TypeRef::Identifier { name, span } => (*name, *span, None),
                    TypeRef::TemplateInstance {
                        name, name_span, args, ..
                    } => (*name, *name_span, Some(self.prepare_args(args))),
                    other => {
                        return Err(ResolutionError::Unresolved {
                            name: None,
                            span: other.span(),
                        });
                    }
                };
                self.resolve_member(&base, name, span, explicit.as_deref())
            }
            TypeRef::Pointer { pointee, .. } => Ok(AbstractType::Pointer(Box::new(self.resolve_type_ref(*pointee)?))),
            TypeRef::Array { element, .. } => Ok(AbstractType::Array(Box::new(self.resolve_type_ref(*element)?))),
            TypeRef::Modified { modifier, inner, .. } => Ok(AbstractType::Modified {
                modifier: *modifier,
                inner: Box::new(self.resolve_type_ref(*inner)?),
            }),
            TypeRef::Typeof { expr, .. } => self.expression_type(*expr),
        }
    }

    /// The aggregate whose members `base.member` searches, with the
    /// template bindings those members resolve under
    ///
    /// Values stand for their type, pointers are dereferenced and an
    /// instance of an eponymous template stands for its eponymous member.
    fn member_target(&mut self, base: &AbstractType) -> Option<(AbstractType, Bindings)> {
        let mut target = base.value_type()?.unqualified().clone();
        while let AbstractType::Pointer(inner) = &target {
            let next = inner.unqualified().clone();
            target = next;
        }
        let mut bindings = self.instance_scope(&target);
        if let AbstractType::TemplateInstance { decl, .. } = &target
            && let Some(member) = self.eponymous_member(*decl)
        {
            let outer = bindings.clone();
            if let Ok(resolved) = self.with_bindings(outer, |this| this.resolve_decl(member)) {
                target = resolved.unqualified().clone();
                bindings.extend(self.instance_scope(&target));
            }
        }
        Some((target, bindings))
    }

    /// `template A(T) { class A {} }`: the class
    fn eponymous_member(&self, decl: DeclRef) -> Option<DeclRef> {
        let source = self.module_of(decl);
        let template = &source.decls[decl.decl];
        if template.aggregate_kind() != Some(AggregateKind::Template) {
            return None;
        }
        let scope = source.scope(ScopeNode::Decl(decl.decl))?;
        scope
            .get(template.name?)
            .first()
            .map(|&member| DeclRef::new(decl.module, member))
    }

    /// Bindings of every instance in `ty`'s base chain
    fn instance_scope(&self, ty: &AbstractType) -> Bindings {
        let mut bindings = Vec::new();
        let mut visited = FxHashSet::default();
        let mut queue = VecDeque::from([ty]);
        while let Some(current) = queue.pop_front() {
            if let AbstractType::TemplateInstance { decl, arguments, .. } = current.unqualified()
                && visited.insert(*decl)
            {
                bindings.extend(parameter_bindings(&self.module_of(*decl), *decl, arguments));
            }
            queue.extend(current.bases());
        }
        bindings
    }

    /// Own members named `name`, else the nearest inherited ones
    fn member_candidates(&self, target: &AbstractType, name: Symbol) -> Vec<DeclRef> {
        let Some(decl) = target.aggregate() else {
            return Vec::new();
        };
        let source = self.module_of(decl);
        let own: Vec<_> = source
            .scope(ScopeNode::Decl(decl.decl))
            .map(|scope| scope.get(name))
            .unwrap_or_default()
            .iter()
            .map(|&member| DeclRef::new(decl.module, member))
            .collect();
        if own.is_empty() {
            self.inherited_named(target.bases(), name)
        } else {
            own
        }
    }

    fn resolve_member(
        &mut self,
        base: &AbstractType,
        name: Symbol,
        span: Span,
        explicit: Option<&[ExplicitArg]>,
    ) -> Result<AbstractType, ResolutionError> {
        let unresolved = ResolutionError::Unresolved { name: Some(name), span };
        let Some((target, bindings)) = self.member_target(base) else {
            return Err(unresolved);
        };
        match &target {
            AbstractType::Aggregate { .. } | AbstractType::TemplateInstance { .. } => {
                let candidates = self.member_candidates(&target, name);
                self.with_bindings(bindings, |this| this.choose(name, span, candidates, explicit))
            }
            AbstractType::Array(element) => match self.interner().resolve(name) {
                "length" => Ok(AbstractType::Primitive(PrimitiveKind::Ulong)),
                "ptr" => Ok(AbstractType::Pointer(element.clone())),
                _ => Err(unresolved),
            },
            _ => Err(unresolved),
        }
    }

    /// Name, location and explicit arguments of the member part of an access
    fn member_name(
        &mut self,
        source: &Module,
        member: ExprId,
    ) -> Result<(Symbol, Span, Option<Vec<ExplicitArg>>), ResolutionError> {
        match &source.exprs[member] {
            Expr::Identifier { name, span } => Ok((*name, *span, None)),
            Expr::TemplateInstance {
                name, name_span, args, ..
            } => Ok((*name, *name_span, Some(self.prepare_args(args)))),
            other => Err(ResolutionError::Unresolved {
                name: None,
                span: other.span(),
            }),
        }
    }

    /// Whether `base.f` may fall back to a free function `f(base)`
    fn is_value_receiver(source: &Module, base: ExprId, receiver: &AbstractType) -> bool {
        !receiver.is_type()
            || !matches!(
                source.exprs[base],
                Expr::Identifier { .. } | Expr::TemplateInstance { .. } | Expr::Access { .. }
            )
    }

    pub(crate) fn expression_symbol(&mut self, expr: ExprId) -> Result<AbstractType, ResolutionError> {
        let source = self.source();
        match &source.exprs[expr] {
            Expr::Identifier { name, span } => self.resolve_name(*name, *span, None),
            Expr::TemplateInstance {
                name, name_span, args, ..
            } => {
                let explicit = self.prepare_args(args);
                self.resolve_name(*name, *name_span, Some(&explicit))
            }
            Expr::Access { base, member, .. } => self.access(*base, *member),
            Expr::Call { .. } => self.call_target(expr),
            Expr::Paren { inner, .. } => self.expression_symbol(*inner),
            _ => self.expression_type(expr),
        }
    }

    fn access(&mut self, base: ExprId, member: ExprId) -> Result<AbstractType, ResolutionError> {
        let source = self.source();
        let receiver = self.expression_symbol(base)?;
        let (name, span, explicit) = self.member_name(&source, member)?;
        let result = self.resolve_member(&receiver, name, span, explicit.as_deref());
        if let Err(ResolutionError::Unresolved { .. }) = result
            && Self::is_value_receiver(&source, base, &receiver)
            && let Some(value) = receiver.value_type().cloned()
        {
            let candidates = self.extension_candidates(name, &value);
            if !candidates.is_empty() {
                trace!(name = self.interner().resolve(name), "member access falls back to a free function");
                return self.choose(name, span, candidates, explicit.as_deref());
            }
        }
        result
    }

    pub(crate) fn call_target(&mut self, call: ExprId) -> Result<AbstractType, ResolutionError> {
        let source = self.source();
        let Expr::Call { callee, args, .. } = &source.exprs[call] else {
            return self.expression_symbol(call);
        };
        let types: Vec<_> = args.iter().map(|&arg| self.expression_type(arg).ok()).collect();

        match &source.exprs[*callee] {
            Expr::Identifier { name, span } => {
                let candidates = self.lookup_name(*name);
                if candidates.is_empty() {
                    return Err(ResolutionError::Unresolved {
                        name: Some(*name),
                        span: *span,
                    });
                }
                self.select_call(*name, candidates, None, &types)
            }
            Expr::TemplateInstance {
                name,
                name_span,
                args: template_args,
                ..
            } => {
                let explicit = self.prepare_args(template_args);
                let candidates = self.lookup_name(*name);
                if candidates.is_empty() {
                    return Err(ResolutionError::Unresolved {
                        name: Some(*name),
                        span: *name_span,
                    });
                }
                self.select_call(*name, candidates, Some(&explicit), &types)
            }
            Expr::Access { base, member, .. } => {
                let receiver = self.expression_symbol(*base)?;
                let (name, _, explicit) = self.member_name(&source, *member)?;
                if let Some((target, bindings)) = self.member_target(&receiver) {
                    let candidates = self.member_candidates(&target, name);
                    if !candidates.is_empty() {
                        return self.with_bindings(bindings, |this| {
                            this.select_call(name, candidates, explicit.as_deref(), &types)
                        });
                    }
                    if Self::is_value_receiver(&source, *base, &receiver) {
                        let candidates = self.extension_candidates(name, &target);
                        if !candidates.is_empty() {
                            trace!(name = self.interner().resolve(name), "call falls back to a free function");
                            let mut with_receiver = vec![Some(target)];
                            with_receiver.extend(types);
                            return self.select_call(name, candidates, explicit.as_deref(), &with_receiver);
                        }
                    }
                }
                self.access(*base, *member)
            }
            _ => self.expression_type(*callee),
        }
    }

    pub(crate) fn expression_type(&mut self, expr: ExprId) -> Result<AbstractType, ResolutionError> {
        let source = self.source();
        let unresolved = |span: Span| ResolutionError::Unresolved { name: None, span };
        match &source.exprs[expr] {
            Expr::Literal { literal, span } => match literal.kind {
                LiteralKind::String(_) => Ok(string_type()),
                _ => ConstEvaluator::new(&source)
                    .evaluate(expr)
                    .map(|value| AbstractType::Primitive(value.kind))
                    .map_err(|_| ResolutionError::NotConstant { span: *span }),
            },
            Expr::Keyword { keyword, span } => self.keyword_type(*keyword, *span),
            Expr::Identifier { .. } | Expr::TemplateInstance { .. } | Expr::Access { .. } | Expr::Call { .. } => {
                let symbol = self.expression_symbol(expr)?;
                if let AbstractType::Member { decl, ty: None } = symbol.terminal() {
                    // surfaces the failure that left the type unknown
                    return self.declaration_type(*decl);
                }
                symbol.value_type().cloned().ok_or_else(|| ResolutionError::Unresolved {
                    name: source.exprs[expr].name().map(|(name, _)| name),
                    span: source.exprs[expr].span(),
                })
            }
            Expr::New { ty, .. } => self.resolve_type_ref(*ty),
            Expr::Index { base, span, .. } => {
                let indexed = self.expression_type(*base)?;
                match indexed.unqualified() {
                    AbstractType::Array(element) | AbstractType::Pointer(element) => Ok((**element).clone()),
                    _ => Err(unresolved(*span)),
                }
            }
            Expr::Binary { op, left, right, .. } => self.binary_type(*op, *left, *right),
            Expr::Unary { op, operand, span } => {
                if *op == UnaryOp::Not {
                    return Ok(AbstractType::Primitive(PrimitiveKind::Bool));
                }
                let operand = self.expression_type(*operand)?;
                match op {
                    UnaryOp::Deref => match operand.unqualified() {
                        AbstractType::Pointer(inner) | AbstractType::Array(inner) => Ok((**inner).clone()),
                        _ => Err(unresolved(*span)),
                    },
                    UnaryOp::AddressOf => Ok(AbstractType::Pointer(Box::new(operand))),
                    UnaryOp::Neg | UnaryOp::Plus | UnaryOp::Complement => Ok(match operand.primitive() {
                        Some(kind) => AbstractType::Primitive(kind.promote(kind)),
                        None => operand,
                    }),
                    _ => Ok(operand),
                }
            }
            Expr::Paren { inner, .. } => self.expression_type(*inner),
            Expr::ArrayLiteral { elements, .. } => {
                let element = match elements.first() {
                    Some(&first) => self.expression_type(first)?,
                    None => AbstractType::Primitive(PrimitiveKind::Void),
                };
                Ok(AbstractType::Array(Box::new(element)))
            }
            Expr::Cast { ty: Some(ty), .. } => self.resolve_type_ref(*ty),
            Expr::Cast { ty: None, operand, .. } => Ok(self.expression_type(*operand)?.unqualified().clone()),
            Expr::Missing { span } => Err(unresolved(*span)),
        }
    }

    fn keyword_type(&mut self, keyword: Keyword, span: Span) -> Result<AbstractType, ResolutionError> {
        let unresolved = ResolutionError::Unresolved { name: None, span };
        Ok(match keyword {
            Keyword::This => self.enclosing_aggregate().ok_or(unresolved)?,
            Keyword::Super => self
                .enclosing_aggregate()
                .and_then(|aggregate| aggregate.bases().first().cloned())
                .ok_or(unresolved)?,
            Keyword::Null => AbstractType::Primitive(PrimitiveKind::Null),
            Keyword::True | Keyword::False => AbstractType::Primitive(PrimitiveKind::Bool),
            Keyword::Dollar => AbstractType::Primitive(PrimitiveKind::Ulong),
            Keyword::File => string_type(),
            Keyword::Line => AbstractType::Primitive(PrimitiveKind::Int),
        })
    }

    /// Innermost class, struct, interface or union on the stack
    fn enclosing_aggregate(&mut self) -> Option<AbstractType> {
        let decl = self.frames.iter().rev().find_map(|frame| match frame.scope {
            ScopeNode::Decl(decl)
                if frame.source.decls[decl]
                    .aggregate_kind()
                    .is_some_and(|kind| kind != AggregateKind::Template) =>
            {
                Some(DeclRef::new(frame.module, decl))
            }
            _ => None,
        })?;
        self.aggregate_type(decl).ok()
    }

    fn binary_type(&mut self, op: BinaryOp, left: ExprId, right: ExprId) -> Result<AbstractType, ResolutionError> {
        if op.is_assignment() {
            return self.expression_type(left);
        }
        if op.is_comparison() || op.is_logical() {
            return Ok(AbstractType::Primitive(PrimitiveKind::Bool));
        }
        let left_type = self.expression_type(left)?;
        if op == BinaryOp::Concat {
            return Ok(left_type);
        }
        let right_type = self.expression_type(right)?;
        Ok(match (left_type.primitive(), right_type.primitive()) {
            (Some(left_kind), Some(right_kind)) => AbstractType::Primitive(match op {
                BinaryOp::Shl | BinaryOp::Shr | BinaryOp::UShr => left_kind.promote(left_kind),
                _ => left_kind.promote(right_kind),
            }),
            (_, None) if matches!(right_type.unqualified(), AbstractType::Pointer(_)) => right_type,
            _ => left_type,
        })
    }

    /// Declared or inferred type of `decl`, guarded so that `typeof` and
    /// `auto` declarations depending on themselves terminate
    pub(crate) fn declaration_type(&mut self, decl: DeclRef) -> Result<AbstractType, ResolutionError> {
        let source = self.module_of(decl);
        let declaration = &source.decls[decl.decl];
        match &declaration.kind {
            DeclKind::Variable { ty: Some(ty), .. }
            | DeclKind::TemplateParameter(TemplateParameter::Value { ty, .. }) => {
                let ty = *ty;
                self.guarded(decl, step::DECLARATION_TYPE, |this| {
                    this.with_declaration_scope(decl, false, |this| this.resolve_type_ref(ty))
                })
            }
            DeclKind::Variable {
                ty: None,
                initializer: Some(initializer),
            } => {
                let initializer = *initializer;
                let chain = source.enclosing_scopes(decl.decl);
                let cursor = Some(declaration.span.start);
                self.guarded(decl, step::DECLARATION_TYPE, |this| {
                    this.with_scopes(decl.module, &source, chain, cursor, |this| this.expression_type(initializer))
                })
            }
            DeclKind::Variable {
                ty: None,
                initializer: None,
            } => Err(ResolutionError::Unresolved {
                name: declaration.name,
                span: declaration.name_span,
            }),
            DeclKind::Function {
                return_type: Some(ty), ..
            } => {
                let ty = *ty;
                self.guarded(decl, step::DECLARATION_TYPE, |this| {
                    this.with_declaration_scope(decl, true, |this| this.resolve_type_ref(ty))
                })
            }
            DeclKind::Function {
                return_type: None,
                body,
                ..
            } => {
                let Some(returned) = body.and_then(|body| first_return(&source, body)) else {
                    return Ok(AbstractType::Primitive(PrimitiveKind::Void));
                };
                let location = source.exprs[returned].span().start;
                let chain = source.scope_chain_at(location);
                self.guarded(decl, step::DECLARATION_TYPE, |this| {
                    this.with_scopes(decl.module, &source, chain, Some(location), |this| {
                        this.expression_type(returned)
                    })
                })
            }
            DeclKind::Module { .. }
            | DeclKind::Aggregate { .. }
            | DeclKind::Alias { .. }
            | DeclKind::TemplateParameter(_) => self.resolve_decl(decl),
        }
    }

    pub(crate) fn constant_of(&mut self, expr: ExprId) -> Result<ConstValue, ResolutionError> {
        let source = self.source();
        let mut names = |_: ExprId, name: Symbol| self.named_constant(name);
        let mut evaluator = ConstEvaluator::with_names(&source, &mut names);
        evaluator.evaluate(expr).map_err(|error| {
            trace!(%error, "expression does not fold");
            ResolutionError::NotConstant { span: error.span() }
        })
    }

    /// Value of an identifier inside a constant expression
    fn named_constant(&mut self, name: Symbol) -> Option<ConstValue> {
        let candidates = self.lookup_name(name);
        let [decl] = candidates.as_slice() else {
            return None;
        };
        let decl = *decl;
        let source = self.module_of(decl);
        let declaration = &source.decls[decl.decl];
        match declaration.kind {
            DeclKind::Variable { .. } if declaration.is_manifest_constant() => self.manifest_constant(decl).ok(),
            DeclKind::TemplateParameter(_) => match self.binding_of(decl) {
                Some(TemplateBinding::Value(value)) => Some(*value),
                _ => None,
            },
            _ => None,
        }
    }

    /// Value of a `const`/`immutable` variable, converted to its declared type
    pub(crate) fn manifest_constant(&mut self, decl: DeclRef) -> Result<ConstValue, ResolutionError> {
        let source = self.module_of(decl);
        let declaration = &source.decls[decl.decl];
        let DeclKind::Variable {
            ty,
            initializer: Some(initializer),
        } = declaration.kind
        else {
            return Err(ResolutionError::NotConstant { span: declaration.span });
        };
        let span = source.exprs[initializer].span();
        self.guarded(decl, step::CONSTANT, |this| {
            this.with_declaration_scope(decl, false, |this| {
                let value = this.constant_of(initializer)?;
                let Some(ty) = ty else {
                    return Ok(value);
                };
                match this.resolve_type_ref(ty)?.primitive() {
                    Some(kind) => value.convert_to(kind).ok_or(ResolutionError::NotConstant { span }),
                    None => Ok(value),
                }
            })
        })
    }
}

/// `immutable(char)[]`, the type of string literals
fn string_type() -> AbstractType {
    AbstractType::Array(Box::new(AbstractType::Modified {
        modifier: TypeModifier::Immutable,
        inner: Box::new(AbstractType::Primitive(PrimitiveKind::Char)),
    }))
}

/// First `return value;` in a function body, not looking into nested
/// declarations
fn first_return(source: &Module, stmt: StmtId) -> Option<ExprId> {
    match &source.stmts[stmt] {
        Stmt::Return { value, .. } => *value,
        Stmt::Block { statements, .. } => statements
            .iter()
            .find_map(|&statement| first_return(source, statement)),
        Stmt::If {
            then_branch,
            else_branch,
            ..
        } => first_return(source, *then_branch).or_else(|| else_branch.and_then(|branch| first_return(source, branch))),
        Stmt::While { body, .. } => first_return(source, *body),
        Stmt::Declaration { .. } | Stmt::Expr { .. } => None,
    }
}
