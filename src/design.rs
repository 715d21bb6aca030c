//! The persisted flow design: nodes, edges and per-kind node configuration.
//!
//! A [`Design`] is the graph container the engine interprets. It is loaded
//! once per run from the Design Repository and is immutable for the duration
//! of the run. Designs originate in a visual editor, so every configuration
//! field tolerates being absent: a half-edited node deserializes into a
//! config whose empty fields read as "not configured", and the executors
//! degrade accordingly instead of failing the load.
//!
//! Node configuration is modeled as one tagged variant per node kind
//! ([`NodeConfig`]), and the same applies to every mutually-exclusive
//! sub-shape (operands, key sources, write mappings): unrepresentable field
//! combinations are ruled out by the type rather than policed at runtime.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::value::{CompareOp, DataType};

/// Identifies the executor a node is interpreted by.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Start,
    Read,
    Write,
    Branch,
    ExistCheck,
    Calculate,
    Aggregate,
    Alert,
    Jump,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeKind::Start => "start",
            NodeKind::Read => "read",
            NodeKind::Write => "write",
            NodeKind::Branch => "binary-branch",
            NodeKind::ExistCheck => "exist-check",
            NodeKind::Calculate => "calculate",
            NodeKind::Aggregate => "aggregate",
            NodeKind::Alert => "alert",
            NodeKind::Jump => "jump",
        };
        write!(f, "{s}")
    }
}

/// A node in the flow graph.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub config: NodeConfig,
}

impl Node {
    pub fn new(id: impl Into<String>, config: NodeConfig) -> Self {
        Self {
            id: id.into(),
            name: None,
            config,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The executor tag for this node.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.config.kind()
    }
}

/// Kind-specific node configuration, tagged by the node kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NodeConfig {
    /// Entry marker; carries no configuration and routes to its default edge.
    Start,
    Read(ReadConfig),
    Write(WriteConfig),
    #[serde(rename = "binary-branch", alias = "branch")]
    Branch(BranchConfig),
    #[serde(rename = "exist-check", alias = "exist")]
    ExistCheck(ExistConfig),
    Calculate(CalculateConfig),
    Aggregate(AggregateConfig),
    Alert(AlertConfig),
    Jump(JumpConfig),
}

impl NodeConfig {
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeConfig::Start => NodeKind::Start,
            NodeConfig::Read(_) => NodeKind::Read,
            NodeConfig::Write(_) => NodeKind::Write,
            NodeConfig::Branch(_) => NodeKind::Branch,
            NodeConfig::ExistCheck(_) => NodeKind::ExistCheck,
            NodeConfig::Calculate(_) => NodeKind::Calculate,
            NodeConfig::Aggregate(_) => NodeKind::Aggregate,
            NodeConfig::Alert(_) => NodeKind::Alert,
            NodeConfig::Jump(_) => NodeKind::Jump,
        }
    }
}

/// Label on an edge leaving a branch-like node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeLabel {
    True,
    False,
}

/// Named output port on an exist-check node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputPort {
    Yes,
    No,
}

/// A directed edge between two nodes.
///
/// An edge with neither a label nor an output port is the *default* edge of
/// its source node; labeled and port edges let several edges leave one node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub label: Option<EdgeLabel>,
    #[serde(default)]
    pub from_output: Option<OutputPort>,
}

impl Edge {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            label: None,
            from_output: None,
        }
    }

    #[must_use]
    pub fn labeled(mut self, label: EdgeLabel) -> Self {
        self.label = Some(label);
        self
    }

    #[must_use]
    pub fn from_port(mut self, port: OutputPort) -> Self {
        self.from_output = Some(port);
        self
    }
}

/// The graph container: everything the engine needs to interpret one flow.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Design {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Design {
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self { nodes, edges }
    }

    /// Look up a node by id.
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// The first start node, used when a run is launched without an explicit
    /// entry node.
    #[must_use]
    pub fn start_node(&self) -> Option<&Node> {
        self.nodes
            .iter()
            .find(|n| matches!(n.config, NodeConfig::Start))
    }

    /// Target of the default (unlabeled, portless) edge leaving `from`.
    #[must_use]
    pub fn default_target(&self, from: &str) -> Option<&str> {
        self.edges
            .iter()
            .find(|e| e.from == from && e.label.is_none() && e.from_output.is_none())
            .map(|e| e.to.as_str())
    }

    /// Target of the edge leaving `from` with the given label.
    #[must_use]
    pub fn labeled_target(&self, from: &str, label: EdgeLabel) -> Option<&str> {
        self.edges
            .iter()
            .find(|e| e.from == from && e.label == Some(label))
            .map(|e| e.to.as_str())
    }

    /// Target of the edge leaving `from` through the given output port.
    #[must_use]
    pub fn port_target(&self, from: &str, port: OutputPort) -> Option<&str> {
        self.edges
            .iter()
            .find(|e| e.from == from && e.from_output == Some(port))
            .map(|e| e.to.as_str())
    }

    /// Parse a design from its persisted JSON form.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize to the persisted JSON form.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ============================================================================
// Shared config building blocks
// ============================================================================

/// Reference to a variable, optionally projecting one field of an object
/// payload (`variableId.fieldPath`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VarRef {
    pub id: String,
    #[serde(default)]
    pub path: Option<String>,
}

impl VarRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            path: None,
        }
    }

    pub fn field(id: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            path: Some(path.into()),
        }
    }
}

/// Right-hand operand of a comparison: a literal, a variable projection, or a
/// system token.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Operand {
    Fixed {
        #[serde(default)]
        value: Value,
    },
    Variable {
        id: String,
        #[serde(default)]
        path: Option<String>,
    },
    System {
        token: String,
    },
}

/// Where a record's primary key comes from when locating a single record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum KeySource {
    Fixed {
        #[serde(default)]
        value: Value,
    },
    Variable {
        id: String,
        #[serde(default)]
        path: Option<String>,
    },
    /// Resolved from the page's URL/query parameters at run time.
    Param {
        name: String,
    },
}

/// The variable a value-producing node writes its result into.
///
/// The id is assigned when the node is first configured and stays stable
/// across subsequent edits, so downstream consumers keep resolving.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputBinding {
    pub id: String,
    #[serde(default)]
    pub data_type: Option<DataType>,
}

impl OutputBinding {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            data_type: None,
        }
    }
}

/// Explicit routing action attached to a branch outcome.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BranchAction {
    /// Continue at the named node.
    Node { target: String },
    /// Hand off to another flow; terminal from this engine's perspective.
    Flow {
        #[serde(default)]
        flow_id: String,
    },
}

// ============================================================================
// Binary branch
// ============================================================================

/// How a branch node decides its outcome.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchMode {
    /// Structured left/operator/right comparison. The default.
    #[default]
    Compare,
    /// Free-text boolean expression.
    Expression,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchConfig {
    #[serde(default)]
    pub mode: BranchMode,
    #[serde(default)]
    pub expression: Option<String>,
    #[serde(default)]
    pub left: Option<VarRef>,
    #[serde(default)]
    pub operator: Option<CompareOp>,
    #[serde(default)]
    pub right: Option<Operand>,
    #[serde(default)]
    pub true_action: Option<BranchAction>,
    #[serde(default)]
    pub false_action: Option<BranchAction>,
}

// ============================================================================
// Exist-check
// ============================================================================

/// One field-to-field rule of an exist-check; all configured rules must hold
/// for a record to count as a match.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRule {
    /// Field read from the subject variable; ignored when the subject is a
    /// scalar.
    #[serde(default)]
    pub source_field: Option<String>,
    pub target_field: String,
    #[serde(default)]
    pub operator: CompareOp,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExistConfig {
    #[serde(default)]
    pub source_variable: Option<String>,
    #[serde(default)]
    pub target_form: Option<String>,
    #[serde(default)]
    pub match_rules: Vec<MatchRule>,
}

// ============================================================================
// Calculate
// ============================================================================

fn coefficient_one() -> f64 {
    1.0
}

/// One weighted term of an addition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Term {
    #[serde(default = "coefficient_one")]
    pub coefficient: f64,
    #[serde(default)]
    pub source: Option<VarRef>,
}

/// One piece of a concat: literal text or a variable projection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ConcatPart {
    Text {
        #[serde(default)]
        value: String,
    },
    Variable {
        id: String,
        #[serde(default)]
        path: Option<String>,
    },
}

/// The operation a calculate node performs.
///
/// Designs saved by newer editors may carry operation kinds this engine does
/// not know; those deserialize into [`CalcOperation::Unknown`], which leaves
/// the output variable unset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum CalcOperation {
    Assign {
        #[serde(default)]
        source: Option<VarRef>,
    },
    Addition {
        #[serde(default)]
        constant: f64,
        #[serde(default)]
        terms: Vec<Term>,
    },
    Subtraction {
        #[serde(default)]
        minuend: Option<VarRef>,
        #[serde(default)]
        subtrahend: Option<VarRef>,
    },
    Multiplication {
        #[serde(default)]
        factors: Vec<VarRef>,
    },
    Division {
        #[serde(default)]
        dividend: Option<VarRef>,
        #[serde(default)]
        divisor: Option<VarRef>,
    },
    Concat {
        #[serde(default)]
        parts: Vec<ConcatPart>,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculateConfig {
    #[serde(default)]
    pub operation: Option<CalcOperation>,
    #[serde(default)]
    pub output: Option<OutputBinding>,
}

// ============================================================================
// Aggregate
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateMethod {
    Count,
    Sum,
    Avg,
    Max,
    Min,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateConfig {
    #[serde(default)]
    pub source: Option<VarRef>,
    /// Field aggregated over; ignored by `count`.
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub method: Option<AggregateMethod>,
    #[serde(default)]
    pub output: Option<OutputBinding>,
}

// ============================================================================
// Read
// ============================================================================

/// Where a read node pulls its data from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ReadSource {
    Form {
        form_id: String,
    },
    /// The run's triggering payload (`$INPUT`).
    #[serde(alias = "page")]
    Input,
}

/// A discrete attribute combination; a record matches when every listed field
/// equals the listed value, and a record passes the filter when *any*
/// configured combination matches.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributePath {
    #[serde(default)]
    pub values: FxHashMap<String, Value>,
}

/// A half-open numeric segment `[min, max)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueSegment {
    pub min: f64,
    pub max: f64,
}

/// Continuous-value filter: the field value must fall in any selected
/// segment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentFilter {
    pub field: String,
    #[serde(default)]
    pub segments: Vec<ValueSegment>,
}

/// Legacy ad-hoc field filter, applied after the range filters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldCondition {
    pub field: String,
    #[serde(default)]
    pub operator: CompareOp,
    #[serde(default)]
    pub value: Value,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortSpec {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

/// How much of the filtered data a read produces.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ReadMode {
    /// One scalar from one record located by primary key.
    Cell {
        #[serde(default)]
        key: Option<KeySource>,
        #[serde(default)]
        field: Option<String>,
    },
    /// The whole filtered, sorted, optionally capped array. Always produces
    /// an array value, possibly empty.
    #[serde(alias = "loop")]
    Batch {
        #[serde(default)]
        sort: Option<SortSpec>,
        #[serde(default)]
        max_count: Option<usize>,
    },
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadConfig {
    #[serde(default)]
    pub source: Option<ReadSource>,
    /// Primary-key allow-list; empty means no key restriction.
    #[serde(default)]
    pub key_filter: Vec<Value>,
    #[serde(default)]
    pub attribute_filters: Vec<AttributePath>,
    #[serde(default)]
    pub segment_filters: Vec<SegmentFilter>,
    #[serde(default)]
    pub conditions: Vec<FieldCondition>,
    /// Column projection; the form's primary key is always retained.
    #[serde(default)]
    pub selected_fields: Vec<String>,
    #[serde(flatten)]
    pub mode: Option<ReadMode>,
    #[serde(default)]
    pub output: Option<OutputBinding>,
}

// ============================================================================
// Write
// ============================================================================

/// How the primary key of a written record is chosen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KeyMode {
    /// Scan the form's current maximum numeric key and add one.
    #[default]
    Auto,
    /// Carry the key field over from the source element.
    FromSource,
}

/// Value source for one mapped field of a batch write, relative to the
/// current source element.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BatchMappingValue {
    /// The named field of the element being written.
    Variable {
        field: String,
    },
    Fixed {
        #[serde(default)]
        value: Value,
    },
    System {
        token: String,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchMapping {
    pub target_field: String,
    pub value: BatchMappingValue,
}

/// Value source for one mapped field of a single-record write.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MappingValue {
    #[serde(alias = "fixed")]
    Constant {
        #[serde(default)]
        value: Value,
    },
    Variable {
        id: String,
    },
    VarPath {
        id: String,
        path: String,
    },
    System {
        token: String,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMapping {
    pub target_field: String,
    pub value: MappingValue,
}

/// Where a single-record write takes its field values from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SingleSource {
    /// Full copy of a source variable's object payload.
    Copy {
        variable: VarRef,
    },
    Mapped {
        #[serde(default)]
        mappings: Vec<FieldMapping>,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum WriteMode {
    /// Iterate a source array variable, writing one record per element.
    Batch {
        #[serde(default)]
        source: Option<VarRef>,
        /// Declared field mappings; empty means copy element fields 1:1
        /// (minus system fields).
        #[serde(default)]
        mappings: Vec<BatchMapping>,
        #[serde(default)]
        key: KeyMode,
    },
    /// Write exactly one new record.
    Single {
        #[serde(default)]
        source: Option<SingleSource>,
    },
    /// Overwrite one field of one existing record.
    Cell {
        #[serde(default)]
        key: Option<KeySource>,
        #[serde(default)]
        field: Option<String>,
        #[serde(default)]
        value: Option<MappingValue>,
    },
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteConfig {
    #[serde(default)]
    pub target_form: Option<String>,
    #[serde(flatten)]
    pub mode: Option<WriteMode>,
}

// ============================================================================
// Alert / Jump
// ============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    /// Plain blocking message.
    #[default]
    Message,
    /// Accept/reject dialog with branching.
    Confirm,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertConfig {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub alert_type: AlertKind,
    #[serde(default)]
    pub true_action: Option<BranchAction>,
    #[serde(default)]
    pub false_action: Option<BranchAction>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OpenMode {
    /// Replace the current location.
    #[default]
    Replace,
    NewTab,
    Popup,
}

/// One query parameter carried by a jump navigation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JumpParam {
    pub name: String,
    pub value: Operand,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JumpConfig {
    /// Target page URL or path.
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub params: Vec<JumpParam>,
    #[serde(default)]
    pub open_mode: OpenMode,
    /// When set, execution proceeds to the default next node after the
    /// navigation side effect is triggered.
    #[serde(default)]
    pub continue_flow: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn node_config_round_trips_by_kind() {
        let json = json!({
            "id": "n1",
            "kind": "binary-branch",
            "left": {"id": "v1"},
            "operator": ">=",
            "right": {"type": "fixed", "value": 10}
        });
        let node: Node = serde_json::from_value(json).unwrap();
        assert_eq!(node.kind(), NodeKind::Branch);
        match &node.config {
            NodeConfig::Branch(cfg) => {
                assert_eq!(cfg.mode, BranchMode::Compare);
                assert_eq!(cfg.left.as_ref().unwrap().id, "v1");
                assert_eq!(cfg.operator, Some(CompareOp::Ge));
            }
            other => panic!("unexpected config: {other:?}"),
        }
    }

    #[test]
    fn partially_edited_node_deserializes_to_empty_config() {
        let node: Node = serde_json::from_value(json!({"id": "w", "kind": "write"})).unwrap();
        match &node.config {
            NodeConfig::Write(cfg) => {
                assert!(cfg.target_form.is_none());
                assert!(cfg.mode.is_none());
            }
            other => panic!("unexpected config: {other:?}"),
        }
    }

    #[test]
    fn unknown_calculate_operation_is_preserved_as_unknown() {
        let node: Node = serde_json::from_value(json!({
            "id": "c",
            "kind": "calculate",
            "operation": {"op": "modulo", "left": 1},
            "output": {"id": "out"}
        }))
        .unwrap();
        match &node.config {
            NodeConfig::Calculate(cfg) => {
                assert_eq!(cfg.operation, Some(CalcOperation::Unknown));
            }
            other => panic!("unexpected config: {other:?}"),
        }
    }

    #[test]
    fn read_mode_accepts_loop_alias() {
        let cfg: ReadConfig = serde_json::from_value(json!({
            "source": {"type": "form", "formId": "f1"},
            "mode": "loop",
            "maxCount": 5
        }))
        .unwrap();
        match cfg.mode {
            Some(ReadMode::Batch { max_count, .. }) => assert_eq!(max_count, Some(5)),
            other => panic!("unexpected mode: {other:?}"),
        }
    }

    #[test]
    fn edge_lookup_prefers_exact_label_and_port() {
        let design = Design::new(
            vec![
                Node::new("a", NodeConfig::Start),
                Node::new("b", NodeConfig::Start),
                Node::new("c", NodeConfig::Start),
            ],
            vec![
                Edge::new("a", "b").labeled(EdgeLabel::True),
                Edge::new("a", "c"),
            ],
        );
        assert_eq!(design.labeled_target("a", EdgeLabel::True), Some("b"));
        assert_eq!(design.labeled_target("a", EdgeLabel::False), None);
        assert_eq!(design.default_target("a"), Some("c"));
        assert_eq!(design.port_target("a", OutputPort::Yes), None);
    }

    #[test]
    fn design_json_round_trip() {
        let design = Design::new(
            vec![
                Node::new("start", NodeConfig::Start),
                Node::new(
                    "calc",
                    NodeConfig::Calculate(CalculateConfig {
                        operation: Some(CalcOperation::Division {
                            dividend: Some(VarRef::new("a")),
                            divisor: Some(VarRef::new("b")),
                        }),
                        output: Some(OutputBinding::new("result")),
                    }),
                ),
            ],
            vec![Edge::new("start", "calc")],
        );
        let json = design.to_json().unwrap();
        let back = Design::from_json(&json).unwrap();
        assert_eq!(design, back);
    }
}
