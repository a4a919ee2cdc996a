//! Tests for form binding and auto-save.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde_json::json;
use tts_forms::{
    Control, Document, Dropdown, DropdownOption, EventBus, Form, InteractionKind,
    PersistenceBinder, SaveStrategy, StoreEvent,
};
use tts_persistence::testing::{FakeBackend, unreachable_config};
use tts_persistence::{DataStore, JsonObject, PersistenceContext, Result, SaveOutcome};

fn losses_form() -> Form {
    Form::new("losses-form")
        .with(Control::number("perdas-vazio-kw"))
        .with(Control::number("peso-projeto-Ton"))
        .with(Control::checkbox("incluir_sobrecarga"))
        .with(Control::select(
            "tipo_aco",
            Dropdown::with_options([
                DropdownOption::new("M4", "M4"),
                DropdownOption::new("H110-27", "H110-27"),
            ]),
        ))
}

fn binder_for(context: PersistenceContext) -> (PersistenceBinder, Arc<EventBus>) {
    let events = Arc::new(EventBus::new());
    let binder = PersistenceBinder::new(Arc::new(context), Arc::clone(&events));
    (binder, events)
}

// ============================================================================
// Binding
// ============================================================================

#[tokio::test]
async fn bind_hydrates_form_and_attaches_listeners() {
    let backend = FakeBackend::start().await.unwrap();
    backend.seed(
        "losses",
        json!({"formData": {"perdas-vazio-kw": 120.5, "tipo_aco": "M4", "incluir_sobrecarga": true}}),
    );
    let (binder, _) = binder_for(PersistenceContext::new(&backend.config(5000)).unwrap());
    let mut form = losses_form();

    let binding = binder.bind(&mut form, "losses").await;

    assert_eq!(binding.newly_bound(), 4);
    assert!(binding.hydration().unwrap().is_complete());
    assert_eq!(form.value("perdas-vazio-kw"), Some("120.50"));
    assert_eq!(form.value("tipo_aco"), Some("M4"));
    assert!(form.control("incluir_sobrecarga").unwrap().is_checked());

    let again = binder.bind(&mut form, "losses").await;
    assert_eq!(again.newly_bound(), 0);
}

#[tokio::test]
async fn bind_without_saved_data_leaves_form_untouched() {
    let backend = FakeBackend::start().await.unwrap();
    let (binder, _) = binder_for(PersistenceContext::new(&backend.config(5000)).unwrap());
    let mut form = losses_form();
    let before = form.clone();

    let binding = binder.bind(&mut form, "losses").await;

    assert!(binding.hydration().is_none());
    assert_eq!(form.value("tipo_aco"), before.value("tipo_aco"));
}

#[tokio::test]
async fn bind_reports_select_values_without_options() {
    let backend = FakeBackend::start().await.unwrap();
    backend.seed("impulse", json!({"formData": {"classe_tensao_at": "145"}}));
    let (binder, _) = binder_for(PersistenceContext::new(&backend.config(5000)).unwrap());
    let mut form = Form::new("impulse-form").with(Control::select("classe_tensao_at", Dropdown::new()));

    let binding = binder.bind(&mut form, "impulse").await;

    assert_eq!(binding.hydration().unwrap().unmatched, vec!["classe_tensao_at"]);
    assert_eq!(form.value("classe_tensao_at"), Some(""));
}

#[tokio::test]
async fn bind_by_id_skips_missing_form() {
    let backend = FakeBackend::start().await.unwrap();
    let (binder, _) = binder_for(PersistenceContext::new(&backend.config(5000)).unwrap());
    let mut document = Document::new().with_form(losses_form());

    assert!(binder.bind_by_id(&mut document, "impulse-form", "impulse").await.is_none());
    assert!(binder.bind_by_id(&mut document, "losses-form", "losses").await.is_some());
    assert!(
        document
            .form("losses-form")
            .unwrap()
            .control("perdas-vazio-kw")
            .unwrap()
            .listeners()
            .is_some()
    );
}

// ============================================================================
// Saving
// ============================================================================

#[tokio::test]
async fn edit_saves_form_and_publishes_module_event() {
    let backend = FakeBackend::start().await.unwrap();
    let (binder, events) = binder_for(PersistenceContext::new(&backend.config(5000)).unwrap());
    let subscription = events.subscribe();
    let mut form = losses_form();
    let binding = binder.bind(&mut form, "losses").await;

    form.set_value("perdas-vazio-kw", "120.5");
    let save = binding
        .handle(&form, "perdas-vazio-kw", InteractionKind::Input)
        .unwrap();

    let event = subscription.try_next().unwrap();
    assert_eq!(event.name(), "moduleDataUpdated");
    assert_eq!(event.store_id(), "losses");
    assert_eq!(event.form_data()["perdas-vazio-kw"], json!("120.5"));
    assert_eq!(event.form_data()["peso-projeto-Ton"], json!(null));

    assert_eq!(save.await.unwrap().unwrap(), SaveOutcome::Remote);
    assert_eq!(backend.request_count("PATCH /stores/losses"), 1);
    assert_eq!(
        backend.stored("losses").unwrap()["formData"]["perdas-vazio-kw"],
        json!("120.5")
    );
}

#[tokio::test]
async fn transformer_inputs_use_compute_endpoint() {
    let backend = FakeBackend::start().await.unwrap();
    let (binder, events) = binder_for(PersistenceContext::new(&backend.config(5000)).unwrap());
    let subscription = events.subscribe();
    let mut form = Form::new("transformer-inputs-form")
        .with(Control::number("potencia_mva"))
        .with(Control::number("tensao_at"));
    let binding = binder.bind(&mut form, "transformerInputs").await;

    form.set_value("potencia_mva", "50");
    form.set_value("tensao_at", "138");
    let save = binding
        .handle(&form, "tensao_at", InteractionKind::Change)
        .unwrap();

    assert!(matches!(
        subscription.try_next(),
        Some(StoreEvent::CanonicalInputsChanged { .. })
    ));
    assert_eq!(save.await.unwrap().unwrap(), SaveOutcome::Remote);
    assert_eq!(backend.request_count("POST /transformer/inputs"), 1);
    assert_eq!(backend.request_count("PATCH /stores/transformerInputs"), 0);
}

#[tokio::test]
async fn unlistened_interactions_are_ignored() {
    let backend = FakeBackend::start().await.unwrap();
    let (binder, events) = binder_for(PersistenceContext::new(&backend.config(5000)).unwrap());
    let subscription = events.subscribe();
    let mut form = losses_form();

    // Before binding nothing listens
    assert!(form.control("tipo_aco").unwrap().listeners().is_none());
    let binding = binder.bind(&mut form, "losses").await;

    assert!(binding.handle(&form, "tipo_aco", InteractionKind::Input).is_none());
    assert!(binding.handle(&form, "unknown", InteractionKind::Change).is_none());
    assert!(subscription.try_next().is_none());
    assert!(binding.handle(&form, "tipo_aco", InteractionKind::Change).is_some());
}

#[tokio::test]
async fn offline_edits_are_saved_locally() {
    let config = unreachable_config().await.unwrap();
    let (binder, events) = binder_for(PersistenceContext::new(&config).unwrap());
    let subscription = events.subscribe();
    let mut form = losses_form();
    let binding = binder.bind(&mut form, "losses").await;

    form.set_value("peso-projeto-Ton", "5");
    let save = binding
        .handle(&form, "peso-projeto-Ton", InteractionKind::Input)
        .unwrap();

    assert_eq!(save.await.unwrap().unwrap(), SaveOutcome::LocalFallback);
    assert_eq!(subscription.pending().count(), 1);
    let saved = tts_persistence::read_store(binder.context().local(), "losses");
    assert_eq!(saved["formData"]["peso-projeto-Ton"], json!("5"));
}

#[derive(Debug, Default)]
struct CountingSave {
    calls: Arc<AtomicUsize>,
}

impl SaveStrategy for CountingSave {
    fn save<'a>(
        &'a self,
        _store: &'a DataStore,
        _form_data: JsonObject,
    ) -> BoxFuture<'a, Result<SaveOutcome>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        async { Ok(SaveOutcome::Remote) }.boxed()
    }
}

#[tokio::test]
async fn custom_strategy_replaces_default_save() {
    let backend = FakeBackend::start().await.unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let (binder, _) = binder_for(PersistenceContext::new(&backend.config(5000)).unwrap());
    let binder = binder.with_strategy(
        "sessions",
        CountingSave {
            calls: Arc::clone(&calls),
        },
    );
    let mut form = losses_form();
    let binding = binder.bind(&mut form, "sessions").await;

    let save = binding
        .handle(&form, "incluir_sobrecarga", InteractionKind::Change)
        .unwrap();
    save.await.unwrap().unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(backend.request_count("PATCH /stores/sessions"), 0);
}
