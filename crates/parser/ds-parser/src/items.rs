use super::*;
use ds_dom::{
    AggregateKind, Attribute, Decl, DeclId, DeclKind, Import, ImportVisibility, TemplateParameter,
    TypeModifier, TypeRefId,
};
use ds_span::Location;

impl Parser<'_> {
    pub(super) fn parse_module(mut self) -> (Module, Vec<ParseError>) {
        if self.eat_keyword("module") {
            if let Some(name) = self.parse_qualified_name() {
                self.builder.set_name(name);
            }
            self.expect_punct(";");
        }

        let mut members = Vec::new();
        while !self.is_eof() {
            self.parse_declarations(&mut members, &[]);
            if self.at_punct("}") {
                self.error_expected("declaration");
                self.bump();
            }
        }

        let span = Span::new(Location::new(1, 1), self.eof.span.end);
        let module = self.builder.finish(members, span);
        (module, self.errors)
    }

    /// Declarations up to the next unmatched `}` or the end of input
    fn parse_declarations(&mut self, out: &mut Vec<DeclId>, inherited: &[Attribute]) {
        let mut sticky = inherited.to_vec();
        while !self.is_eof() && !self.at_punct("}") {
            let before = self.cursor;
            if self.eat_punct(";") {
                continue;
            }

            let start = self.start();
            let mut attributes = sticky.clone();
            let own = self.parse_attributes();
            let labelled = !own.is_empty();
            attributes.extend(own);

            if labelled && self.eat_punct(":") {
                sticky = attributes;
            } else if labelled && self.eat_punct("{") {
                self.parse_declarations(out, &attributes);
                self.expect_punct("}");
            } else if self.at_keyword("import") {
                self.parse_import(&attributes);
            } else {
                out.extend(self.parse_declaration(start, attributes));
            }

            if self.cursor == before {
                self.error_expected("declaration");
                self.bump();
                self.synchronize();
            }
        }
    }

    /// Attributes followed by one declaration (or an import)
    pub(super) fn parse_attributed_declaration(&mut self, start: Location) -> Vec<DeclId> {
        let attributes = self.parse_attributes();
        if self.at_keyword("import") {
            self.parse_import(&attributes);
            return Vec::new();
        }
        self.parse_declaration(start, attributes)
    }

    fn parse_attributes(&mut self) -> Vec<Attribute> {
        let mut attributes = Vec::new();
        loop {
            if self.eat_punct("@") {
                // user-defined and `@property`-style attributes carry no meaning here
                self.ident();
                if self.at_punct("(") {
                    self.cursor = self.skip_balanced(self.cursor).unwrap_or(self.cursor + 1);
                }
                continue;
            }
            let TokenKind::Keyword(keyword) = *self.current_kind() else {
                break;
            };
            if TypeModifier::from_keyword(keyword).is_some() && self.punct_at(self.cursor + 1, "(") {
                break;
            }
            match Attribute::from_keyword(keyword) {
                Some(attribute) => attributes.push(attribute),
                None if matches!(keyword, "pure" | "nothrow") => {}
                None => break,
            }
            self.bump();
        }
        attributes
    }

    fn parse_declaration(&mut self, start: Location, attributes: Vec<Attribute>) -> Vec<DeclId> {
        let aggregate = match self.current_kind() {
            TokenKind::Keyword("class") => Some(AggregateKind::Class),
            TokenKind::Keyword("struct") => Some(AggregateKind::Struct),
            TokenKind::Keyword("interface") => Some(AggregateKind::Interface),
            TokenKind::Keyword("union") => Some(AggregateKind::Union),
            TokenKind::Keyword("template") => Some(AggregateKind::Template),
            _ => None,
        };
        if let Some(kind) = aggregate {
            return vec![self.parse_aggregate(start, attributes, kind)];
        }
        if self.at_keyword("alias") {
            return self.parse_alias(start, attributes).into_iter().collect();
        }
        if self.at_keyword("this") && self.punct_at(self.cursor + 1, "(") {
            let name_span = self.bump().span;
            let name = self.interner.intern("this");
            return vec![self.parse_function(start, attributes, None, (name, name_span))];
        }
        self.parse_function_or_variables(start, attributes)
    }

    fn parse_aggregate(&mut self, start: Location, attributes: Vec<Attribute>, kind: AggregateKind) -> DeclId {
        self.bump();
        let name = self.expect_ident("aggregate name");
        let template_parameters = if self.at_punct("(") {
            self.parse_template_parameters()
        } else {
            Vec::new()
        };
        self.skip_constraint();

        let mut bases = Vec::new();
        if kind != AggregateKind::Template && self.eat_punct(":") {
            loop {
                // protection on base classes carries no meaning here
                while matches!(self.current_kind(), TokenKind::Keyword("public" | "private" | "protected")) {
                    self.bump();
                }
                match self.parse_type() {
                    Some(base) => bases.push(base),
                    None => break,
                }
                if !self.eat_punct(",") {
                    break;
                }
            }
        }

        let mut members = Vec::new();
        if self.eat_punct("{") {
            self.parse_declarations(&mut members, &[]);
            self.expect_punct("}");
        } else {
            self.expect_punct(";");
        }

        let mut decl = Decl::new(
            name.map(|(name, _)| name),
            name.map_or_else(|| Span::empty(start), |(_, span)| span),
            self.span_from(start),
            DeclKind::Aggregate {
                kind,
                bases,
                members,
            },
        );
        decl.attributes = attributes;
        decl.template_parameters = template_parameters;
        self.builder.alloc_decl(decl)
    }

    /// `alias Name = Type;` or `alias Type Name;`
    fn parse_alias(&mut self, start: Location, attributes: Vec<Attribute>) -> Option<DeclId> {
        self.bump();
        let (name, target) = if self.ident_at(self.cursor) && self.punct_at(self.cursor + 1, "=") {
            let name = self.ident();
            self.bump();
            (name, self.parse_type())
        } else {
            let target = self.parse_type();
            (self.expect_ident("alias name"), target)
        };
        self.expect_punct(";");

        let Some(target) = target else {
            self.synchronize();
            return None;
        };
        let mut decl = Decl::new(
            name.map(|(name, _)| name),
            name.map_or_else(|| Span::empty(start), |(_, span)| span),
            self.span_from(start),
            DeclKind::Alias { target },
        );
        decl.attributes = attributes;
        Some(self.builder.alloc_decl(decl))
    }

    fn parse_function_or_variables(&mut self, start: Location, attributes: Vec<Attribute>) -> Vec<DeclId> {
        // `auto x = 1;`, `static f() {}`: storage classes stand in for the type
        let inferred = !attributes.is_empty()
            && self.ident_at(self.cursor)
            && ["=", ";", ",", "("]
                .iter()
                .any(|punct| self.punct_at(self.cursor + 1, punct));
        let ty = if inferred {
            None
        } else {
            match self.parse_type() {
                Some(ty) => Some(ty),
                None => {
                    self.synchronize();
                    return Vec::new();
                }
            }
        };

        let Some(name) = self.expect_ident("declaration name") else {
            self.synchronize();
            return Vec::new();
        };

        if self.at_punct("(") {
            return vec![self.parse_function(start, attributes, ty, name)];
        }

        let mut decls = Vec::new();
        let mut declarator_start = start;
        let mut name = name;
        loop {
            let initializer = if self.eat_punct("=") {
                self.parse_expression()
            } else {
                None
            };
            let mut decl = Decl::new(
                Some(name.0),
                name.1,
                self.span_from(declarator_start),
                DeclKind::Variable { ty, initializer },
            );
            decl.attributes.clone_from(&attributes);
            decls.push(self.builder.alloc_decl(decl));

            if !self.eat_punct(",") {
                break;
            }
            declarator_start = self.start();
            match self.expect_ident("variable name") {
                Some(next) => name = next,
                None => break,
            }
        }
        if !self.expect_punct(";") {
            self.synchronize();
        }
        decls
    }

    fn parse_function(
        &mut self,
        start: Location,
        attributes: Vec<Attribute>,
        return_type: Option<TypeRefId>,
        (name, name_span): (ds_intern::Symbol, Span),
    ) -> DeclId {
        let has_template_parameters = self
            .skip_balanced(self.cursor)
            .is_some_and(|end| self.punct_at(end, "("));
        let template_parameters = if has_template_parameters {
            self.parse_template_parameters()
        } else {
            Vec::new()
        };
        let parameters = self.parse_parameters();

        // trailing member function attributes
        loop {
            if self.eat_punct("@") {
                self.ident();
                continue;
            }
            match self.current_kind() {
                TokenKind::Keyword(
                    "const" | "immutable" | "shared" | "inout" | "pure" | "nothrow" | "scope" | "override",
                ) => {
                    self.bump();
                }
                _ => break,
            }
        }
        self.skip_constraint();

        let body = if self.at_punct("{") {
            Some(self.parse_block())
        } else {
            self.expect_punct(";");
            None
        };

        let mut decl = Decl::new(
            Some(name),
            name_span,
            self.span_from(start),
            DeclKind::Function {
                parameters,
                return_type,
                body,
            },
        );
        decl.attributes = attributes;
        decl.template_parameters = template_parameters;
        self.builder.alloc_decl(decl)
    }

    /// `(T, T : Base, T = int, int u : 1, alias A)`
    fn parse_template_parameters(&mut self) -> Vec<DeclId> {
        self.expect_punct("(");
        let mut parameters = Vec::new();
        while !self.at_punct(")") && !self.is_eof() {
            let start = self.start();
            let parameter = if self.eat_keyword("alias") {
                let name = self.expect_ident("alias parameter");
                let default = if self.eat_punct("=") { self.parse_type() } else { None };
                name.map(|name| (name, TemplateParameter::Alias { default }))
            } else if self.ident_at(self.cursor)
                && [",", ")", ":", "="]
                    .iter()
                    .any(|punct| self.punct_at(self.cursor + 1, punct))
            {
                let name = self.ident();
                let constraint = if self.eat_punct(":") { self.parse_type() } else { None };
                let default = if self.eat_punct("=") { self.parse_type() } else { None };
                name.map(|name| (name, TemplateParameter::Type { constraint, default }))
            } else {
                let ty = self.parse_type();
                let name = self.expect_ident("value parameter");
                let specialization = if self.eat_punct(":") {
                    self.parse_non_assign_expression()
                } else {
                    None
                };
                let default = if self.eat_punct("=") {
                    self.parse_non_assign_expression()
                } else {
                    None
                };
                ty.zip(name).map(|(ty, name)| {
                    (
                        name,
                        TemplateParameter::Value {
                            ty,
                            specialization,
                            default,
                        },
                    )
                })
            };

            match parameter {
                Some(((name, name_span), parameter)) => {
                    let decl = Decl::new(
                        Some(name),
                        name_span,
                        self.span_from(start),
                        DeclKind::TemplateParameter(parameter),
                    );
                    parameters.push(self.builder.alloc_decl(decl));
                }
                None => {
                    while !self.is_eof() && !self.at_punct(",") && !self.at_punct(")") {
                        self.bump();
                    }
                }
            }

            if !self.eat_punct(",") {
                break;
            }
        }
        self.expect_punct(")");
        parameters
    }

    /// `(Type name, Type name = default, ...)`
    fn parse_parameters(&mut self) -> Vec<DeclId> {
        self.expect_punct("(");
        let mut parameters = Vec::new();
        while !self.at_punct(")") && !self.is_eof() {
            let start = self.start();
            let mut attributes = Vec::new();
            while let TokenKind::Keyword(keyword) = *self.current_kind() {
                let storage = matches!(keyword, "in" | "out" | "ref" | "lazy" | "scope" | "final" | "auto")
                    || (TypeModifier::from_keyword(keyword).is_some()
                        && !self.punct_at(self.cursor + 1, "("));
                if !storage {
                    break;
                }
                attributes.extend(Attribute::from_keyword(keyword));
                self.bump();
            }
            if self.eat_punct("...") {
                continue;
            }

            let Some(ty) = self.parse_type() else {
                while !self.is_eof() && !self.at_punct(",") && !self.at_punct(")") {
                    self.bump();
                }
                if !self.eat_punct(",") {
                    break;
                }
                continue;
            };
            let name = self.ident();
            let initializer = if self.eat_punct("=") {
                self.parse_non_assign_expression()
            } else {
                None
            };
            self.eat_punct("...");

            let mut decl = Decl::new(
                name.map(|(name, _)| name),
                name.map_or_else(|| self.builder.type_ref(ty).span(), |(_, span)| span),
                self.span_from(start),
                DeclKind::Variable {
                    ty: Some(ty),
                    initializer,
                },
            );
            decl.attributes = attributes;
            parameters.push(self.builder.alloc_decl(decl));

            if !self.eat_punct(",") {
                break;
            }
        }
        self.expect_punct(")");
        parameters
    }

    /// `import a.b, c.d : x, y;`
    fn parse_import(&mut self, attributes: &[Attribute]) {
        self.bump();
        let visibility = if attributes.contains(&Attribute::Public) {
            ImportVisibility::Public
        } else {
            ImportVisibility::Private
        };

        loop {
            let start = self.start();
            // `import io = std.stdio;` binds a renamed module; the rename is not tracked
            if self.ident_at(self.cursor) && self.punct_at(self.cursor + 1, "=") {
                self.bump();
                self.bump();
            }
            let Some(module) = self.parse_qualified_name() else {
                self.synchronize();
                return;
            };

            let mut selective = Vec::new();
            let has_selection = self.eat_punct(":");
            if has_selection {
                loop {
                    if self.ident_at(self.cursor) && self.punct_at(self.cursor + 1, "=") {
                        self.bump();
                        self.bump();
                    }
                    match self.expect_ident("imported symbol") {
                        Some((name, _)) => selective.push(name),
                        None => break,
                    }
                    if !self.eat_punct(",") {
                        break;
                    }
                }
            }

            self.builder.add_import(Import {
                module,
                visibility,
                selective,
                span: self.span_from(start),
            });

            if has_selection || !self.eat_punct(",") {
                break;
            }
        }
        self.expect_punct(";");
    }

    /// Template constraints `if (...)` are not evaluated
    fn skip_constraint(&mut self) {
        if self.at_keyword("if") && self.punct_at(self.cursor + 1, "(") {
            self.bump();
            self.cursor = self.skip_balanced(self.cursor).unwrap_or(self.cursor + 1);
        }
    }
}
