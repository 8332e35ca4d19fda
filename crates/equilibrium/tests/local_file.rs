use equilibrium::local_file::{LocalFile, LocalFileController, LocalFileSpec, LocalFileState};
use equilibrium::prelude::*;

fn put_default_namespace(ctx: &Context) {
    ctx.resources.put(Resource::new("v1", "Namespace", Metadata::new("default"))).unwrap();
}

#[test]
fn reconciles_a_local_file_through_its_lifecycle() {
    let workdir = tempfile::tempdir().unwrap();
    let target = workdir.path().join("greeting.txt");

    let ctx = Context::create(Backend::in_memory()).unwrap();
    ctx.register_resource_type::<LocalFile>().unwrap();
    ctx.register_controller(CrudControllerAdapter::new(LocalFileController));
    put_default_namespace(&ctx);

    let mut resource = Resource::new("example.com/v1", "LocalFile", Metadata::new("greeting").with_namespace("default"));
    resource
        .set_typed_spec(&LocalFileSpec {
            path: target.to_string_lossy().into_owned(),
            content: "hello, world".to_string(),
        })
        .unwrap();
    ctx.resources.put(resource).unwrap();

    ctx.controllers.reconcile().unwrap();
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "hello, world");

    let uri = Uri::new("example.com/v1", "LocalFile", Some("default".into()), "greeting").unwrap();
    let stored = ctx.resources.get(&uri).unwrap().unwrap();
    let state: LocalFileState = stored.typed_state().unwrap().unwrap();
    assert_eq!(state.path, target.to_string_lossy());

    let mut update = Resource::new("example.com/v1", "LocalFile", Metadata::new("greeting").with_namespace("default"));
    update
        .set_typed_spec(&LocalFileSpec {
            path: target.to_string_lossy().into_owned(),
            content: "goodbye, world".to_string(),
        })
        .unwrap();
    ctx.resources.put(update).unwrap();
    ctx.controllers.reconcile().unwrap();
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "goodbye, world");

    ctx.resources.delete(&uri, true, false).unwrap();
    ctx.controllers.reconcile().unwrap();
    assert!(!target.exists());
    assert!(ctx.resources.get(&uri).unwrap().is_none());
}

#[test]
fn recreates_file_deleted_out_of_band() {
    let workdir = tempfile::tempdir().unwrap();
    let target = workdir.path().join("note.txt");

    let ctx = Context::create(Backend::in_memory()).unwrap();
    ctx.register_resource_type::<LocalFile>().unwrap();
    ctx.register_controller(CrudControllerAdapter::new(LocalFileController));
    put_default_namespace(&ctx);

    let mut resource = Resource::new("example.com/v1", "LocalFile", Metadata::new("note").with_namespace("default"));
    resource
        .set_typed_spec(&LocalFileSpec {
            path: target.to_string_lossy().into_owned(),
            content: "note to self".to_string(),
        })
        .unwrap();
    ctx.resources.put(resource).unwrap();
    ctx.controllers.reconcile().unwrap();
    assert!(target.exists());

    std::fs::remove_file(&target).unwrap();
    // The sweep that first observes the out-of-band deletion only clears
    // the stored state; recreation happens on the sweep after that.
    ctx.controllers.reconcile().unwrap();
    assert!(!target.exists());
    ctx.controllers.reconcile().unwrap();
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "note to self");
}
