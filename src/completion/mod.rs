/// Completion-related modules.
///
/// This sub-module groups all completion logic:
/// - **classifier**: what kind of completion the text before the cursor asks for
/// - **expression_under_cursor**: backwards scanning for the expression being completed
/// - **engine**: one completion cycle, dispatched on the trigger
/// - **call** / **qt_methods** / **include**: call hints and signatures, Qt
///   signal/slot names, include paths
/// - **static_lists**: keywords, Doxygen commands, preprocessor directives
/// - **ranking**: ordering, de-duplication and prefix filtering
/// - **qualify**: qualified-name proposals for names not in reach
/// - **insertion**: the buffer edit a commit performs
/// - **session**: the editor-side state machine around a cycle
/// - **builder** / **handler**: LSP glue
pub mod builder;
pub mod call;
pub mod classifier;
pub mod engine;
pub mod expression_under_cursor;
pub mod handler;
pub mod include;
pub mod insertion;
pub mod qt_methods;
pub mod qualify;
pub mod ranking;
pub mod session;
pub mod static_lists;
