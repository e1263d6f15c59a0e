//! The default statement-support registry: one support per RFC 7950 keyword.
//!
//! Structural keywords override phase hooks; everything else is a
//! [`SimpleSupport`] carrying its argument kind, copy policy, and
//! substatement cardinality grammar.

use std::sync::{Arc, LazyLock};

use crate::error::ReactorIssue;
use crate::model::{ArgumentValue, DeviateKind, YangKeyword};
use crate::reactor::arena::StmtId;
use crate::reactor::namespace::{ExtensionNs, FeatureNs, GroupingNs, IdentityNs, TypedefNs};
use crate::reactor::reactor::Reactor;
use crate::reactor::support::{
    ArgKind, Registry, SimpleSupport, StatementPolicy, StatementSupport, SubstatementValidator,
    SubstatementValidatorBuilder,
};

use YangKeyword::*;

/// Process-wide default registry. Prefer threading an explicit registry
/// through [`crate::reactor::ReactorBuilder::registry`]; this singleton is
/// the convenience layer.
pub fn default_registry() -> Arc<Registry> {
    static REGISTRY: LazyLock<Arc<Registry>> = LazyLock::new(|| Arc::new(build_registry()));
    Arc::clone(&REGISTRY)
}

fn meta_children(builder: SubstatementValidatorBuilder) -> SubstatementValidatorBuilder {
    builder
        .optional(Description)
        .optional(Reference)
        .optional(Status)
}

fn data_def_children(builder: SubstatementValidatorBuilder) -> SubstatementValidatorBuilder {
    builder
        .any(Container)
        .any(Leaf)
        .any(LeafList)
        .any(List)
        .any(Choice)
        .any(Anydata)
        .any(Anyxml)
        .any(Uses)
}

fn body_children(builder: SubstatementValidatorBuilder) -> SubstatementValidatorBuilder {
    data_def_children(builder)
        .any(Typedef)
        .any(Grouping)
        .any(Action)
        .any(Notification)
}

fn simple(
    keyword: YangKeyword,
    arg: ArgKind,
    policy: StatementPolicy,
    validator: Option<SubstatementValidator>,
) -> Arc<dyn StatementSupport> {
    Arc::new(SimpleSupport {
        keyword,
        arg,
        policy,
        validator,
    })
}

struct ModuleSupport {
    validator: SubstatementValidator,
}

impl StatementSupport for ModuleSupport {
    fn keyword(&self) -> YangKeyword {
        Module
    }

    fn arg_kind(&self) -> ArgKind {
        ArgKind::Identifier
    }

    fn policy(&self) -> StatementPolicy {
        StatementPolicy::RejectReplica
    }

    fn validator(&self) -> Option<&SubstatementValidator> {
        Some(&self.validator)
    }

    fn on_linkage(&self, rx: &mut Reactor, ctx: StmtId) -> Result<(), ReactorIssue> {
        rx.link_module(ctx)
    }
}

struct SubmoduleSupport {
    validator: SubstatementValidator,
}

impl StatementSupport for SubmoduleSupport {
    fn keyword(&self) -> YangKeyword {
        Submodule
    }

    fn arg_kind(&self) -> ArgKind {
        ArgKind::Identifier
    }

    fn policy(&self) -> StatementPolicy {
        StatementPolicy::RejectReplica
    }

    fn validator(&self) -> Option<&SubstatementValidator> {
        Some(&self.validator)
    }

    fn on_linkage(&self, rx: &mut Reactor, ctx: StmtId) -> Result<(), ReactorIssue> {
        rx.link_submodule(ctx)
    }
}

struct ImportSupport {
    validator: SubstatementValidator,
}

impl StatementSupport for ImportSupport {
    fn keyword(&self) -> YangKeyword {
        Import
    }

    fn arg_kind(&self) -> ArgKind {
        ArgKind::Identifier
    }

    fn policy(&self) -> StatementPolicy {
        StatementPolicy::RejectReplica
    }

    fn validator(&self) -> Option<&SubstatementValidator> {
        Some(&self.validator)
    }

    fn on_linkage(&self, rx: &mut Reactor, ctx: StmtId) -> Result<(), ReactorIssue> {
        rx.schedule_import(ctx)
    }
}

struct IncludeSupport;

impl StatementSupport for IncludeSupport {
    fn keyword(&self) -> YangKeyword {
        Include
    }

    fn arg_kind(&self) -> ArgKind {
        ArgKind::Identifier
    }

    fn policy(&self) -> StatementPolicy {
        StatementPolicy::RejectReplica
    }

    fn on_linkage(&self, rx: &mut Reactor, ctx: StmtId) -> Result<(), ReactorIssue> {
        rx.schedule_include(ctx)
    }
}

/// Registers named definitions into their scoped namespaces.
struct DefinitionSupport<N> {
    keyword: YangKeyword,
    validator: SubstatementValidator,
    _ns: std::marker::PhantomData<N>,
}

impl<N> DefinitionSupport<N> {
    fn new(keyword: YangKeyword, validator: SubstatementValidator) -> Self {
        Self {
            keyword,
            validator,
            _ns: std::marker::PhantomData,
        }
    }
}

impl<N> StatementSupport for DefinitionSupport<N>
where
    N: crate::reactor::namespace::Namespace<Key = smol_str::SmolStr, Value = StmtId>
        + Send
        + Sync,
{
    fn keyword(&self) -> YangKeyword {
        self.keyword
    }

    fn arg_kind(&self) -> ArgKind {
        ArgKind::Identifier
    }

    fn validator(&self) -> Option<&SubstatementValidator> {
        Some(&self.validator)
    }

    fn on_statement_definition(&self, rx: &mut Reactor, ctx: StmtId) -> Result<(), ReactorIssue> {
        rx.register_definition::<N>(ctx)
    }
}

struct AugmentSupport {
    validator: SubstatementValidator,
}

impl StatementSupport for AugmentSupport {
    fn keyword(&self) -> YangKeyword {
        Augment
    }

    fn arg_kind(&self) -> ArgKind {
        ArgKind::SchemaNodeId
    }

    fn policy(&self) -> StatementPolicy {
        StatementPolicy::CopyOnUse
    }

    fn validator(&self) -> Option<&SubstatementValidator> {
        Some(&self.validator)
    }

    fn on_effective_model(&self, rx: &mut Reactor, ctx: StmtId) -> Result<(), ReactorIssue> {
        rx.schedule_augment(ctx)
    }
}

struct DeviationSupport {
    validator: SubstatementValidator,
}

impl StatementSupport for DeviationSupport {
    fn keyword(&self) -> YangKeyword {
        Deviation
    }

    fn arg_kind(&self) -> ArgKind {
        ArgKind::SchemaNodeId
    }

    fn validator(&self) -> Option<&SubstatementValidator> {
        Some(&self.validator)
    }

    fn on_effective_model(&self, rx: &mut Reactor, ctx: StmtId) -> Result<(), ReactorIssue> {
        rx.schedule_deviation(ctx)
    }
}

/// `deviate` picks its cardinality grammar from its parsed argument.
struct DeviateSupport {
    not_supported: SubstatementValidator,
    add: SubstatementValidator,
    replace: SubstatementValidator,
    delete: SubstatementValidator,
}

impl DeviateSupport {
    fn new() -> Self {
        Self {
            not_supported: SubstatementValidator::none(),
            add: SubstatementValidator::builder()
                .optional(Config)
                .optional(Default)
                .optional(Mandatory)
                .optional(Units)
                .optional(MinElements)
                .optional(MaxElements)
                .any(Must)
                .any(Unique)
                .build(),
            replace: SubstatementValidator::builder()
                .optional(Config)
                .optional(Default)
                .optional(Mandatory)
                .optional(MaxElements)
                .optional(MinElements)
                .optional(Type)
                .optional(Units)
                .build(),
            delete: SubstatementValidator::builder()
                .optional(Default)
                .optional(Units)
                .any(Must)
                .any(Unique)
                .build(),
        }
    }
}

impl StatementSupport for DeviateSupport {
    fn keyword(&self) -> YangKeyword {
        Deviate
    }

    fn arg_kind(&self) -> ArgKind {
        ArgKind::Deviate
    }

    fn on_full_declaration(&self, rx: &mut Reactor, ctx: StmtId) -> Result<(), ReactorIssue> {
        rx.parse_argument(ctx, ArgKind::Deviate)?;
        let kind = match rx.arena[ctx].argument {
            Some(ArgumentValue::Deviate(kind)) => kind,
            _ => return Ok(()),
        };
        let validator = match kind {
            DeviateKind::NotSupported => &self.not_supported,
            DeviateKind::Add => &self.add,
            DeviateKind::Replace => &self.replace,
            DeviateKind::Delete => &self.delete,
        };
        rx.validate_substatements(ctx, validator)
    }
}

fn build_registry() -> Registry {
    let mut registry = Registry::new();

    registry.register(Arc::new(ModuleSupport {
        validator: body_children(
            SubstatementValidator::builder()
                .mandatory(Namespace)
                .mandatory(Prefix)
                .optional(YangVersion)
                .any(Import)
                .any(Include)
                .any(Revision)
                .optional(Organization)
                .optional(Contact)
                .optional(Description)
                .optional(Reference)
                .any(Feature)
                .any(Identity)
                .any(Extension)
                .any(Augment)
                .any(Deviation)
                .any(Rpc),
        )
        .build(),
    }));
    registry.register(Arc::new(SubmoduleSupport {
        validator: body_children(
            SubstatementValidator::builder()
                .mandatory(BelongsTo)
                .optional(YangVersion)
                .any(Import)
                .any(Include)
                .any(Revision)
                .optional(Organization)
                .optional(Contact)
                .optional(Description)
                .optional(Reference)
                .any(Feature)
                .any(Identity)
                .any(Extension)
                .any(Augment)
                .any(Deviation)
                .any(Rpc),
        )
        .build(),
    }));
    registry.register(Arc::new(ImportSupport {
        validator: SubstatementValidator::builder()
            .mandatory(Prefix)
            .optional(RevisionDate)
            .optional(Description)
            .optional(Reference)
            .build(),
    }));
    registry.register(Arc::new(IncludeSupport));

    registry.register(Arc::new(DefinitionSupport::<GroupingNs>::new(
        Grouping,
        body_children(meta_children(SubstatementValidator::builder())).build(),
    )));
    registry.register(Arc::new(DefinitionSupport::<TypedefNs>::new(
        Typedef,
        meta_children(SubstatementValidator::builder())
            .mandatory(Type)
            .optional(Units)
            .optional(Default)
            .build(),
    )));
    // feature: description/if-feature/status/reference per the external
    // cardinality grammar
    registry.register(Arc::new(DefinitionSupport::<FeatureNs>::new(
        Feature,
        SubstatementValidator::builder()
            .optional(Description)
            .any(IfFeature)
            .optional(Status)
            .optional(Reference)
            .build(),
    )));
    registry.register(Arc::new(DefinitionSupport::<IdentityNs>::new(
        Identity,
        meta_children(SubstatementValidator::builder())
            .any(Base)
            .any(IfFeature)
            .build(),
    )));
    registry.register(Arc::new(DefinitionSupport::<ExtensionNs>::new(
        Extension,
        meta_children(SubstatementValidator::builder())
            .optional(Argument)
            .build(),
    )));

    registry.register(Arc::new(AugmentSupport {
        validator: data_def_children(
            meta_children(SubstatementValidator::builder())
                .optional(When)
                .any(IfFeature)
                .any(Case)
                .any(Action)
                .any(Notification),
        )
        .build(),
    }));
    registry.register(Arc::new(DeviationSupport {
        validator: SubstatementValidator::builder()
            .optional(Description)
            .optional(Reference)
            .at_least_one(Deviate)
            .build(),
    }));
    registry.register(Arc::new(DeviateSupport::new()));

    use ArgKind as A;
    use StatementPolicy::{ContextIndependent as Plain, CopyOnUse, RejectReplica};

    let none = SubstatementValidator::none;
    let meta = || meta_children(SubstatementValidator::builder()).build();
    let constrained = || {
        SubstatementValidator::builder()
            .optional(ErrorMessage)
            .optional(ErrorAppTag)
            .optional(Description)
            .optional(Reference)
            .build()
    };

    let table: Vec<Arc<dyn StatementSupport>> = vec![
        simple(YangVersion, A::Str, RejectReplica, Some(none())),
        simple(Namespace, A::Str, RejectReplica, Some(none())),
        simple(Prefix, A::Identifier, RejectReplica, Some(none())),
        simple(
            BelongsTo,
            A::Identifier,
            RejectReplica,
            Some(SubstatementValidator::builder().mandatory(Prefix).build()),
        ),
        simple(
            Revision,
            A::Revision,
            Plain,
            Some(
                SubstatementValidator::builder()
                    .optional(Description)
                    .optional(Reference)
                    .build(),
            ),
        ),
        simple(RevisionDate, A::Revision, Plain, Some(none())),
        simple(Organization, A::Str, Plain, Some(none())),
        simple(Contact, A::Str, Plain, Some(none())),
        simple(Description, A::Str, Plain, Some(none())),
        simple(Reference, A::Str, Plain, Some(none())),
        simple(Status, A::Status, Plain, Some(none())),
        simple(Config, A::Boolean, CopyOnUse, Some(none())),
        simple(Mandatory, A::Boolean, CopyOnUse, Some(none())),
        simple(Presence, A::Str, CopyOnUse, Some(none())),
        simple(OrderedBy, A::OrderedBy, CopyOnUse, Some(none())),
        simple(MinElements, A::NonNegInteger, CopyOnUse, Some(none())),
        simple(MaxElements, A::MaxElements, CopyOnUse, Some(none())),
        simple(Units, A::Str, Plain, Some(none())),
        simple(Default, A::Str, CopyOnUse, Some(none())),
        simple(IfFeature, A::IfFeature, CopyOnUse, Some(none())),
        simple(Base, A::Ref, CopyOnUse, Some(none())),
        simple(
            Type,
            A::Ref,
            CopyOnUse,
            Some(
                SubstatementValidator::builder()
                    .optional(Range)
                    .optional(Length)
                    .any(Pattern)
                    .any(Enum)
                    .any(Bit)
                    .optional(Path)
                    .optional(RequireInstance)
                    .optional(FractionDigits)
                    .optional(Base)
                    .any(Type)
                    .build(),
            ),
        ),
        simple(Range, A::Str, CopyOnUse, Some(constrained())),
        simple(Length, A::Str, CopyOnUse, Some(constrained())),
        simple(Pattern, A::Str, CopyOnUse, Some(constrained())),
        simple(
            Enum,
            A::Str,
            CopyOnUse,
            Some(
                meta_children(SubstatementValidator::builder())
                    .optional(Value)
                    .any(IfFeature)
                    .build(),
            ),
        ),
        simple(Value, A::Integer, Plain, Some(none())),
        simple(
            Bit,
            A::Identifier,
            CopyOnUse,
            Some(
                meta_children(SubstatementValidator::builder())
                    .optional(Position)
                    .any(IfFeature)
                    .build(),
            ),
        ),
        simple(Position, A::NonNegInteger, Plain, Some(none())),
        simple(FractionDigits, A::NonNegInteger, Plain, Some(none())),
        simple(Path, A::Path, CopyOnUse, Some(none())),
        simple(RequireInstance, A::Boolean, CopyOnUse, Some(none())),
        simple(
            Container,
            A::Identifier,
            CopyOnUse,
            Some(
                body_children(meta_children(SubstatementValidator::builder()))
                    .optional(Config)
                    .optional(Presence)
                    .optional(When)
                    .any(IfFeature)
                    .any(Must)
                    .build(),
            ),
        ),
        simple(
            Leaf,
            A::Identifier,
            CopyOnUse,
            Some(
                meta_children(SubstatementValidator::builder())
                    .mandatory(Type)
                    .optional(Units)
                    .optional(Default)
                    .optional(Config)
                    .optional(Mandatory)
                    .optional(When)
                    .any(IfFeature)
                    .any(Must)
                    .build(),
            ),
        ),
        simple(
            LeafList,
            A::Identifier,
            CopyOnUse,
            Some(
                meta_children(SubstatementValidator::builder())
                    .mandatory(Type)
                    .optional(Units)
                    .any(Default)
                    .optional(Config)
                    .optional(MinElements)
                    .optional(MaxElements)
                    .optional(OrderedBy)
                    .optional(When)
                    .any(IfFeature)
                    .any(Must)
                    .build(),
            ),
        ),
        simple(
            List,
            A::Identifier,
            CopyOnUse,
            Some(
                body_children(meta_children(SubstatementValidator::builder()))
                    .optional(Key)
                    .any(Unique)
                    .optional(Config)
                    .optional(MinElements)
                    .optional(MaxElements)
                    .optional(OrderedBy)
                    .optional(When)
                    .any(IfFeature)
                    .any(Must)
                    .build(),
            ),
        ),
        simple(Key, A::KeyList, CopyOnUse, Some(none())),
        simple(Unique, A::UniqueList, CopyOnUse, Some(none())),
        simple(
            Choice,
            A::Identifier,
            CopyOnUse,
            Some(
                data_def_children(meta_children(SubstatementValidator::builder()))
                    .any(Case)
                    .optional(Default)
                    .optional(Mandatory)
                    .optional(Config)
                    .optional(When)
                    .any(IfFeature)
                    .build(),
            ),
        ),
        simple(
            Case,
            A::Identifier,
            CopyOnUse,
            Some(
                data_def_children(meta_children(SubstatementValidator::builder()))
                    .optional(When)
                    .any(IfFeature)
                    .build(),
            ),
        ),
        simple(
            Uses,
            A::Ref,
            CopyOnUse,
            Some(
                meta_children(SubstatementValidator::builder())
                    .optional(When)
                    .any(IfFeature)
                    .any(Refine)
                    .any(Augment)
                    .build(),
            ),
        ),
        simple(
            Refine,
            A::SchemaNodeId,
            CopyOnUse,
            Some(
                SubstatementValidator::builder()
                    .optional(Description)
                    .optional(Reference)
                    .optional(Config)
                    .optional(Mandatory)
                    .optional(Presence)
                    .optional(Default)
                    .optional(MinElements)
                    .optional(MaxElements)
                    .optional(Units)
                    .any(Must)
                    .any(IfFeature)
                    .build(),
            ),
        ),
        simple(When, A::Str, CopyOnUse, Some(meta())),
        simple(Must, A::Str, CopyOnUse, Some(constrained())),
        simple(ErrorMessage, A::Str, Plain, Some(none())),
        simple(ErrorAppTag, A::Str, Plain, Some(none())),
        simple(
            Anyxml,
            A::Identifier,
            CopyOnUse,
            Some(
                meta_children(SubstatementValidator::builder())
                    .optional(Config)
                    .optional(Mandatory)
                    .optional(When)
                    .any(IfFeature)
                    .any(Must)
                    .build(),
            ),
        ),
        simple(
            Anydata,
            A::Identifier,
            CopyOnUse,
            Some(
                meta_children(SubstatementValidator::builder())
                    .optional(Config)
                    .optional(Mandatory)
                    .optional(When)
                    .any(IfFeature)
                    .any(Must)
                    .build(),
            ),
        ),
        simple(
            Rpc,
            A::Identifier,
            Plain,
            Some(
                meta_children(SubstatementValidator::builder())
                    .optional(Input)
                    .optional(Output)
                    .any(Typedef)
                    .any(Grouping)
                    .any(IfFeature)
                    .build(),
            ),
        ),
        simple(
            Action,
            A::Identifier,
            CopyOnUse,
            Some(
                meta_children(SubstatementValidator::builder())
                    .optional(Input)
                    .optional(Output)
                    .any(Typedef)
                    .any(Grouping)
                    .any(IfFeature)
                    .build(),
            ),
        ),
        simple(
            Input,
            A::None,
            Plain,
            Some(
                data_def_children(SubstatementValidator::builder())
                    .any(Typedef)
                    .any(Grouping)
                    .any(Must)
                    .build(),
            ),
        ),
        simple(
            Output,
            A::None,
            Plain,
            Some(
                data_def_children(SubstatementValidator::builder())
                    .any(Typedef)
                    .any(Grouping)
                    .any(Must)
                    .build(),
            ),
        ),
        simple(
            Notification,
            A::Identifier,
            CopyOnUse,
            Some(
                body_children(meta_children(SubstatementValidator::builder()))
                    .any(IfFeature)
                    .any(Must)
                    .build(),
            ),
        ),
        simple(
            Argument,
            A::Identifier,
            Plain,
            Some(SubstatementValidator::builder().optional(YinElement).build()),
        ),
        simple(YinElement, A::Boolean, Plain, Some(none())),
    ];
    for support in table {
        registry.register(support);
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_covers_all_keywords() {
        let registry = default_registry();
        // every keyword the parser can produce has a support
        for kw in [
            Module, Submodule, Import, Include, BelongsTo, Grouping, Typedef, Feature,
            Identity, Extension, Augment, Deviation, Deviate, Uses, Refine, Container, Leaf,
            LeafList, List, Choice, Case, Rpc, Action, Input, Output, Notification, Type,
            Revision, Description,
        ] {
            assert!(registry.get(kw).is_some(), "missing support for {kw}");
        }
    }

    #[test]
    fn test_registry_is_shared() {
        let a = default_registry();
        let b = default_registry();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
