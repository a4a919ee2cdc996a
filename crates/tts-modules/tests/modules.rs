//! Tests for module controllers and module data reset.

use std::sync::Arc;

use serde_json::json;
use tts_forms::{
    Control, Dropdown, DropdownOption, EventBus, Form, InteractionKind, PersistenceBinder,
    StoreEvent,
};
use tts_modules::{
    ModuleController, ModuleError, ModuleId, TransformerInputsController, clear_all_modules_data,
    clear_module_data,
};
use tts_persistence::testing::FakeBackend;
use tts_persistence::{
    JsonObject, LossesOperation, PersistError, PersistenceContext, ProcessRequest, SaveOutcome,
    read_store, write_store,
};
use tts_standards::{STANDARD_FIELD, Winding};

struct Harness {
    backend: FakeBackend,
    context: Arc<PersistenceContext>,
    events: Arc<EventBus>,
    binder: PersistenceBinder,
}

async fn harness() -> Harness {
    let backend = FakeBackend::start().await.unwrap();
    let context = Arc::new(PersistenceContext::new(&backend.config(5000)).unwrap());
    let events = Arc::new(EventBus::new());
    let binder = PersistenceBinder::new(Arc::clone(&context), Arc::clone(&events));
    Harness {
        backend,
        context,
        events,
        binder,
    }
}

fn object(value: serde_json::Value) -> JsonObject {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

fn inputs_form() -> Form {
    let mut form = Form::new("transformer-inputs-form")
        .with(Control::select(
            STANDARD_FIELD,
            Dropdown::with_options(["IEC", "NBR", "IEEE"].map(|v| DropdownOption::new(v, v))),
        ))
        .with(Control::number("potencia_mva"))
        .with(Control::number("tensao_at"))
        .with(Control::number("corrente_nominal_at"));
    let at = Winding::At;
    for id in [
        at.voltage_class_field(),
        at.nbi_field(),
        at.sil_field(),
        at.applied_voltage_field(),
    ] {
        form.push(Control::select(&id, Dropdown::new()));
    }
    form
}

fn losses_form() -> Form {
    Form::new("losses-form")
        .with(Control::number("perdas_vazio_kw"))
        .with(Control::number("temperatura_referencia"))
}

// ============================================================================
// Module data reset
// ============================================================================

#[tokio::test]
async fn clear_module_maps_name_to_store() {
    let h = harness().await;
    h.backend.seed("appliedVoltage", json!({"formData": {"x": 1}}));
    write_store(h.context.local(), "appliedVoltage", &json!({"formData": {"x": 1}})).unwrap();

    let outcome = clear_module_data(&h.context, "applied_voltage").await.unwrap();

    assert_eq!(outcome, SaveOutcome::Remote);
    assert_eq!(h.backend.request_count("DELETE /stores/appliedVoltage"), 1);
    assert!(h.backend.stored("appliedVoltage").is_none());
    assert_eq!(read_store(h.context.local(), "appliedVoltage"), json!({}));
}

#[tokio::test]
async fn clear_module_local_cleanup_survives_remote_failure() {
    let h = harness().await;
    h.context.init().await;
    write_store(h.context.local(), "sessions", &json!({"formData": {"name": "a"}})).unwrap();
    h.backend.set_failing(true);

    let outcome = clear_module_data(&h.context, "history").await.unwrap();

    assert_eq!(outcome, SaveOutcome::EmergencyLocal);
    assert_eq!(read_store(h.context.local(), "sessions"), json!({}));
}

#[tokio::test]
async fn clear_all_modules_deletes_every_store() {
    let h = harness().await;
    h.backend.seed("losses", json!({"formData": {}}));
    h.backend.seed("impulse", json!({"formData": {}}));

    clear_all_modules_data(&h.context).await.unwrap();

    assert_eq!(h.backend.request_count("DELETE /stores"), 1);
    assert!(h.backend.stored("losses").is_none());
    assert!(h.backend.stored("impulse").is_none());
}

#[tokio::test]
async fn clear_all_resets_controller_caches() {
    let h = harness().await;
    h.backend.seed("losses", json!({"formData": {"perdas_vazio_kw": "120.5"}}));
    let controller = ModuleController::new(ModuleId::Losses, Arc::clone(&h.context));
    assert_eq!(
        controller.store().get_data().await["formData"]["perdas_vazio_kw"],
        json!("120.5")
    );

    clear_all_modules_data(&h.context).await.unwrap();

    assert_eq!(*controller.store().get_data().await, json!({}));
    assert!(Arc::ptr_eq(controller.store(), &h.context.get_store("losses")));
}

// ============================================================================
// Transformer inputs
// ============================================================================

#[tokio::test]
async fn inputs_attach_restores_dependent_selections() {
    let h = harness().await;
    h.backend.seed(
        "transformerInputs",
        json!({"formData": {
            "norma_iso": "IEC",
            "potencia_mva": 50,
            "classe_tensao_at": "245",
            "nbi_at": "950",
            "sil_at": "750",
            "corrente_nominal_at": 209.18
        }}),
    );
    let subscription = h.events.subscribe();
    let controller = TransformerInputsController::new(&h.context, Arc::clone(&h.events)).unwrap();
    let mut form = inputs_form();

    controller.attach(&h.binder, &mut form).await.unwrap();

    assert_eq!(form.value("classe_tensao_at"), Some("245"));
    assert_eq!(form.value("nbi_at"), Some("950"));
    assert_eq!(form.value("sil_at"), Some("750"));
    assert!(form.control("sil_at").unwrap().is_visible());
    assert_eq!(form.value("corrente_nominal_at"), Some("209.18"));

    let Some(StoreEvent::CanonicalInputsChanged { form_data }) = subscription.try_next() else {
        panic!("expected the initial transformer inputs event");
    };
    assert_eq!(form_data["potencia_mva"], json!(50));
}

#[tokio::test]
async fn inputs_attach_without_data_stays_quiet() {
    let h = harness().await;
    let subscription = h.events.subscribe();
    let controller = TransformerInputsController::new(&h.context, Arc::clone(&h.events)).unwrap();
    let mut form = inputs_form();

    controller.attach(&h.binder, &mut form).await.unwrap();

    assert!(subscription.try_next().is_none());
    assert_eq!(
        form.control("classe_tensao_at")
            .and_then(Control::dropdown)
            .unwrap()
            .options()
            .len(),
        17
    );
}

#[tokio::test]
async fn inputs_attach_keeps_saved_values_missing_from_table() {
    let h = harness().await;
    h.backend.seed(
        "transformerInputs",
        json!({"formData": {"norma_iso": "IEC", "classe_tensao_at": "245", "nbi_at": "999"}}),
    );
    let controller = TransformerInputsController::new(&h.context, Arc::clone(&h.events)).unwrap();
    let mut form = inputs_form();

    controller.attach(&h.binder, &mut form).await.unwrap();

    assert_eq!(form.value("nbi_at"), Some("999"));
    let selected = form
        .control("nbi_at")
        .and_then(Control::dropdown)
        .and_then(|dropdown| dropdown.selected_option())
        .unwrap();
    assert!(selected.is_temporary());
}

#[tokio::test]
async fn inputs_save_shows_derived_currents() {
    let h = harness().await;
    let controller = TransformerInputsController::new(&h.context, Arc::clone(&h.events)).unwrap();
    let mut form = inputs_form();
    let binding = controller.attach(&h.binder, &mut form).await.unwrap();

    form.set_value("potencia_mva", "50");
    form.set_value("tensao_at", "138");
    let save = controller
        .handle(&binding, &mut form, "tensao_at", InteractionKind::Change)
        .unwrap();
    assert_eq!(save.await.unwrap().unwrap(), SaveOutcome::Remote);

    assert_eq!(controller.refresh_nominal_currents(&mut form).await.unwrap(), 1);
    assert_eq!(form.value("corrente_nominal_at"), Some("209.18"));
    assert_eq!(
        controller.nominal_currents().await.unwrap(),
        vec![("corrente_nominal_at", json!(209.18))]
    );
}

#[tokio::test]
async fn inputs_class_change_resolves_before_saving() {
    let h = harness().await;
    let controller = TransformerInputsController::new(&h.context, Arc::clone(&h.events)).unwrap();
    let mut form = inputs_form();
    let binding = controller.attach(&h.binder, &mut form).await.unwrap();

    form.set_value("classe_tensao_at", "72.5");
    let save = controller
        .handle(&binding, &mut form, "classe_tensao_at", InteractionKind::Change)
        .unwrap();
    save.await.unwrap().unwrap();

    assert!(form
        .control("nbi_at")
        .and_then(Control::dropdown)
        .unwrap()
        .contains("325"));
    let stored = h.backend.stored("transformerInputs").unwrap();
    assert_eq!(stored["formData"]["classe_tensao_at"], json!("72.5"));
}

// ============================================================================
// Module controller
// ============================================================================

#[tokio::test]
async fn process_requires_transformer_inputs() {
    let h = harness().await;
    let controller = ModuleController::new(ModuleId::Impulse, Arc::clone(&h.context));

    let result = controller.process(JsonObject::new()).await;

    assert!(matches!(result, Err(ModuleError::MissingTransformerData)));
    assert_eq!(h.backend.request_count("POST /transformer/modules/impulse/process"), 0);
}

#[tokio::test]
async fn losses_need_an_operation() {
    let h = harness().await;
    h.backend.seed("transformerInputs", json!({"formData": {"potencia_mva": 50}}));
    let controller = ModuleController::new(ModuleId::Losses, Arc::clone(&h.context));

    assert!(matches!(
        controller.process(JsonObject::new()).await,
        Err(ModuleError::OperationRequired { .. })
    ));
    assert_eq!(h.backend.request_count("POST /transformer/modules/losses/process"), 0);

    let impulse = ModuleController::new(ModuleId::Impulse, Arc::clone(&h.context));
    assert!(matches!(
        impulse
            .process_losses(LossesOperation::LoadLosses, JsonObject::new())
            .await,
        Err(ModuleError::OperationNotSupported { .. })
    ));
}

#[tokio::test]
async fn losses_operations_store_results_separately() {
    let h = harness().await;
    h.backend.seed(
        "transformerInputs",
        json!({"formData": {"potencia_mva": 50, "tipo_transformador": "Trifásico"}}),
    );
    let controller = ModuleController::new(ModuleId::Losses, Arc::clone(&h.context));
    let mut form = losses_form();
    form.set_value("perdas_vazio_kw", "30");

    let no_load = controller
        .process_losses_form(LossesOperation::NoLoadLosses, &form)
        .await
        .unwrap();
    let load = controller
        .process_losses(
            LossesOperation::LoadLosses,
            object(json!({"temperatura_referencia": "75"})),
        )
        .await
        .unwrap();

    assert_eq!(no_load["operation"], json!("no_load_losses"));
    assert_eq!(no_load["data_fields"], json!(4));
    assert_eq!(load["operation"], json!("load_losses"));
    assert_eq!(load["data_fields"], json!(3));
    assert_eq!(
        h.backend.request_count("POST /transformer/modules/losses/process"),
        2
    );

    let stored = h.backend.stored("losses").unwrap();
    assert_eq!(stored["results"]["no_load_losses"], no_load);
    assert_eq!(stored["results"]["load_losses"], load);
}

#[tokio::test]
async fn losses_without_operation_are_rejected_by_backend() {
    let h = harness().await;
    let request = ProcessRequest::new(json!({"potencia_mva": 50}), json!({}));

    let result = h.context.remote().process_module("losses", &request).await;

    assert!(matches!(
        result,
        Err(PersistError::HttpStatus { status: 400, .. })
    ));
}

#[tokio::test]
async fn process_stores_results_in_module_store() {
    let h = harness().await;
    h.backend.seed(
        "transformerInputs",
        json!({"formData": {"potencia_mva": 50, "tensao_at": 138}}),
    );
    let controller = ModuleController::new(ModuleId::AppliedVoltage, Arc::clone(&h.context));
    let mut form = losses_form();
    form.set_value("perdas_vazio_kw", "30");

    let results = controller.process_form(&form).await.unwrap();

    assert_eq!(results["module"], json!("appliedVoltage"));
    assert_eq!(results["basic_fields"], json!(2));
    assert_eq!(results["module_fields"], json!(2));
    assert_eq!(
        h.backend.request_count("POST /transformer/modules/appliedVoltage/process"),
        1
    );
    assert_eq!(h.backend.stored("appliedVoltage").unwrap()["results"], results);
}

#[tokio::test]
async fn process_rejects_modules_without_calculation() {
    let h = harness().await;
    let controller = ModuleController::new(ModuleId::History, Arc::clone(&h.context));

    assert!(matches!(
        controller.process(JsonObject::new()).await,
        Err(ModuleError::NotProcessable { .. })
    ));
}

#[tokio::test]
async fn attach_hydrates_form_and_loads_panel() {
    let h = harness().await;
    h.backend.seed("losses", json!({"formData": {"perdas_vazio_kw": 30}}));
    h.backend.seed(
        "transformerInputs",
        json!({"formData": {"potencia_mva": 50, "frequencia": 60}}),
    );
    let mut controller = ModuleController::new(ModuleId::Losses, Arc::clone(&h.context));
    let mut form = losses_form();

    let binding = controller.attach(&h.binder, &mut form).await;

    assert_eq!(binding.store_id(), "losses");
    assert_eq!(form.value("perdas_vazio_kw"), Some("30.00"));
    assert_eq!(controller.panel().text("potencia_mva"), Some("50.00 MVA"));
    assert_eq!(controller.panel().text("frequencia"), Some("60.00 Hz"));
    assert_eq!(controller.panel().text("tensao_at"), Some("-"));
}

#[tokio::test]
async fn canonical_change_refreshes_panel_and_ignores_local_changes() {
    let h = harness().await;
    h.backend.seed("impulse", json!({"formData": {"perdas_vazio_kw": 12}}));
    let subscription = h.events.subscribe();
    let mut controller = ModuleController::new(ModuleId::Impulse, Arc::clone(&h.context));
    let mut form = losses_form();

    h.events.publish(StoreEvent::for_store(
        "losses",
        object(json!({"perdas_vazio_kw": "99"})),
    ));
    h.events.publish(StoreEvent::for_store(
        "transformerInputs",
        object(json!({"potencia_mva": "75"})),
    ));

    assert_eq!(controller.drain_events(&subscription, &mut form).await, 1);
    assert_eq!(controller.panel().text("potencia_mva"), Some("75 MVA"));
    assert_eq!(form.value("perdas_vazio_kw"), Some("12.00"));
}
